use super::network::{Network, Topology};
use super::Target;
use crate::*;
use rand::{Rng, RngCore};
use std::f32::consts::PI;

// A unit is one sprite steered by its own untrained network.
// Every simulation step it:
// - measures the distance and angle to the target
// - feeds [distance / 800, angle / PI, speed / 5, 0.0] through its network
// - reads back [o0, o1] as speed = o0 * 5 and direction = o1 * PI
// - moves along the direction and gets clamped back inside the playfield
//
// Nothing stops the speed from going negative, in which case the unit moves away from
// the direction its network picked.

/// Integer screen-space box (origin top-left, y down) used for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Component, Debug, Clone)]
pub struct Unit {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub rect: Bounds,
    // Position in the unit collection, fixes the drawing order.
    pub order: usize,
    brain: Network,
}

/// Widths of the network every unit is born with.
pub fn unit_topology() -> Topology {
    match Topology::new(UNIT_TOPOLOGY.to_vec()) {
        Ok(topology) => topology,
        Err(err) => unreachable!("UNIT_TOPOLOGY is invalid: {err}"),
    }
}

impl Unit {
    pub fn new(x: f32, y: f32, order: usize, brain: Network) -> Self {
        assert_eq!(
            (brain.topology().inputs(), brain.topology().outputs()),
            (UNIT_TOPOLOGY[0], UNIT_TOPOLOGY[UNIT_TOPOLOGY.len() - 1]),
            "a unit's network must take 4 inputs and give 2 outputs"
        );
        Self {
            x,
            y,
            speed: UNIT_START_SPEED,
            rect: Bounds {
                x: x as i32,
                y: y as i32,
                w: UNIT_SIZE.x as i32,
                h: UNIT_SIZE.y as i32,
            },
            order,
            brain,
        }
    }

    /// A fresh unit at a random integer spot of the playfield with a random network.
    /// The position is drawn before the network.
    pub fn random(order: usize, rng: &mut dyn RngCore) -> Self {
        let x = rng.gen_range(0..WIDTH as i32) as f32;
        let y = rng.gen_range(0..HEIGHT as i32) as f32;
        let brain = Network::random(&unit_topology(), rng);
        Self::new(x, y, order, brain)
    }

    pub fn brain(&self) -> &Network {
        &self.brain
    }

    /// The input vector handed to the network for the given target.
    pub fn sense(&self, target: Target) -> [f32; 4] {
        let dx = target.x as f32 - self.x;
        let dy = target.y as f32 - self.y;
        let distance = (dx * dx + dy * dy).sqrt();
        let angle = dy.atan2(dx);
        [
            distance / DISTANCE_SCALE,
            angle / PI,
            self.speed / SPEED_SCALE,
            0.0, // unused slot
        ]
    }

    /// One simulation step toward `target`.
    pub fn update(&mut self, target: Target) {
        let outputs = self.brain.feed_forward(&self.sense(target));

        self.speed = outputs[0] * SPEED_SCALE;
        let direction = outputs[1] * PI;

        self.x += direction.cos() * self.speed;
        self.y += direction.sin() * self.speed;

        // Hard clamp, the unit's box has to stay fully inside the window
        self.x = self.x.clamp(0.0, WIDTH - self.rect.w as f32);
        self.y = self.y.clamp(0.0, HEIGHT - self.rect.h as f32);

        self.rect.x = self.x as i32;
        self.rect.y = self.y as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::network::{Layer, Neuron};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // Hidden layer is all zeros, so the outputs are exactly [tanh(b0), tanh(b1)] whatever the input.
    fn constant_brain(b0: f32, b1: f32) -> Network {
        let hidden = Layer::new((0..6).map(|_| Neuron::new(vec![0.0; 4], 0.0)).collect()).unwrap();
        let output = Layer::new(vec![
            Neuron::new(vec![0.0; 6], b0),
            Neuron::new(vec![0.0; 6], b1),
        ])
        .unwrap();
        Network::from_layers(vec![hidden, output]).unwrap()
    }

    #[test]
    fn sense_normalizes_distance_angle_and_speed() {
        let unit = Unit::new(100.0, 300.0, 0, constant_brain(0.0, 0.0));
        let inputs = unit.sense(Target { x: 400, y: 300 });
        assert_relative_eq!(inputs[0], 300.0 / 800.0);
        assert_relative_eq!(inputs[1], 0.0);
        assert_relative_eq!(inputs[2], 2.0 / 5.0);
        assert_eq!(inputs[3], 0.0);

        let unit = Unit::new(400.0, 400.0, 0, constant_brain(0.0, 0.0));
        let inputs = unit.sense(Target { x: 400, y: 300 });
        assert_relative_eq!(inputs[0], 100.0 / 800.0);
        assert_relative_eq!(inputs[1], -0.5);
    }

    #[test]
    fn update_follows_network_outputs() {
        let mut unit = Unit::new(200.0, 200.0, 0, constant_brain(0.5, 0.25));
        unit.update(Target { x: 400, y: 300 });

        let speed = 0.5f32.tanh() * 5.0;
        let direction = 0.25f32.tanh() * PI;
        assert_relative_eq!(unit.speed, speed);
        assert_relative_eq!(unit.x, 200.0 + direction.cos() * speed);
        assert_relative_eq!(unit.y, 200.0 + direction.sin() * speed);
        assert_eq!(unit.rect.x, unit.x as i32);
        assert_eq!(unit.rect.y, unit.y as i32);
    }

    #[test]
    fn negative_speed_moves_against_direction() {
        let mut unit = Unit::new(300.0, 300.0, 0, constant_brain(-0.8, 0.0));
        unit.update(Target { x: 0, y: 0 });

        assert!(unit.speed < 0.0);
        // direction is 0 (pointing right), so a negative speed moves left
        assert!(unit.x < 300.0);
        assert_relative_eq!(unit.y, 300.0);
    }

    #[test]
    fn update_clamps_to_playfield() {
        // direction PI * tanh(0) = 0 -> right, tanh(3) * 5 ~ 4.95 per step
        let mut unit = Unit::new(758.0, 10.0, 0, constant_brain(3.0, 0.0));
        unit.update(Target { x: 400, y: 300 });
        assert_eq!(unit.x, 760.0);
        assert_eq!(unit.rect.x, 760);

        // pointing left
        let mut unit = Unit::new(1.0, 10.0, 0, constant_brain(3.0, 3.0));
        let direction = 3.0f32.tanh() * PI;
        assert!(direction.cos() < 0.0);
        unit.update(Target { x: 400, y: 300 });
        assert_eq!(unit.x, 0.0);

        // pointing down (screen space), starting past the bottom edge
        let mut unit = Unit::new(100.0, 599.0, 0, constant_brain(3.0, 0.5f32.atanh()));
        unit.update(Target { x: 400, y: 300 });
        assert_eq!(unit.y, 560.0);
        assert_eq!(unit.rect.y, 560);

        // pointing up
        let mut unit = Unit::new(100.0, 2.0, 0, constant_brain(3.0, (-0.5f32).atanh()));
        unit.update(Target { x: 400, y: 300 });
        assert_eq!(unit.y, 0.0);
    }

    #[test]
    fn random_units_start_inside_window_with_default_speed() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for order in 0..50 {
            let unit = Unit::random(order, &mut rng);
            assert!((0.0..WIDTH).contains(&unit.x));
            assert!((0.0..HEIGHT).contains(&unit.y));
            assert_eq!(unit.x.fract(), 0.0);
            assert_eq!(unit.speed, 2.0);
            assert_eq!((unit.rect.w, unit.rect.h), (40, 40));
            assert_eq!(unit.brain().topology().widths(), &[4, 6, 2]);
        }
    }

    #[test]
    #[should_panic(expected = "a unit's network must take 4 inputs and give 2 outputs")]
    fn unit_rejects_wrong_shaped_brain() {
        let brain = Network::from_layers(vec![Layer::new(vec![Neuron::new(vec![0.0; 3], 0.0)]).unwrap()])
            .unwrap();
        Unit::new(0.0, 0.0, 0, brain);
    }
}
