use std::sync::Arc;

use arcane_survivors::sim::{
    Camera, GamePhase, MovementKeys, TickInput, Viewport, WorldState, ZoomCommand, tick,
};
use arcane_survivors::tuning::{Content, select_random_upgrades};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;

fn zoom_command() -> impl Strategy<Value = ZoomCommand> {
    prop_oneof![
        Just(ZoomCommand::In),
        Just(ZoomCommand::Out),
        Just(ZoomCommand::Reset),
        (-10.0f32..10.0).prop_map(ZoomCommand::Wheel),
    ]
}

fn movement() -> impl Strategy<Value = MovementKeys> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(up, down, left, right)| MovementKeys {
            up,
            down,
            left,
            right,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn zoom_stays_within_limits(commands in prop::collection::vec(zoom_command(), 1..60)) {
        let mut camera = Camera::default();
        for command in commands {
            camera.apply(command);
            camera.update_zoom();
            prop_assert!(
                camera.target_zoom >= camera.min_zoom && camera.target_zoom <= camera.max_zoom
            );
            prop_assert!(camera.zoom >= camera.min_zoom && camera.zoom <= camera.max_zoom);
        }
    }

    #[test]
    fn ticks_never_leave_dead_enemies(
        seed in any::<u64>(),
        keys in prop::collection::vec(movement(), 1..240),
    ) {
        let mut world = WorldState::new(seed, Arc::new(Content::default()));
        let input = |movement: MovementKeys| TickInput {
            movement,
            viewport: Some(Viewport::default()),
            ..Default::default()
        };

        let mut now = 0.0;
        for movement in keys {
            now += 16.0;
            tick(&mut world, &input(movement), 16.0, now);
            prop_assert!(world.enemies.iter().all(|e| !e.is_dead));
            prop_assert!(world.gems.iter().all(|g| !g.collected));
            prop_assert!(world.stats.health <= world.stats.max_health);
            if world.phase == GamePhase::GameOver {
                break;
            }
        }
    }

    #[test]
    fn upgrade_offers_are_distinct(seed in any::<u64>(), level in 1u32..40, count in 1usize..6) {
        let content = Content::default();
        let available =
            content.available_upgrades(|token| if token == "wand" { Some(1) } else { None });
        let mut rng = Pcg32::seed_from_u64(seed);

        let offer = select_random_upgrades(&available, count, level, &mut rng);
        prop_assert!(offer.len() <= count);
        prop_assert!(offer.len() <= available.len());
        for (i, a) in offer.iter().enumerate() {
            prop_assert!(offer[i + 1..].iter().all(|b| b.id != a.id));
        }
    }
}
