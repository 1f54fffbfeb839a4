use std::time::Duration;

use treasure_hunt_core::{
    Position,
    config::GameConfig,
    environment::{CellType, Layout},
    pathfinding::AStar,
    session::{
        LossReason, ManualClock, Outcome, SessionController, SessionStatus, TickReport,
    },
};

fn scripted(layout: &str) -> (SessionController<AStar, ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let config = GameConfig {
        seed: Some(11),
        ..GameConfig::default()
    };
    let controller = SessionController::with_parts(config, AStar, clock.clone())
        .unwrap()
        .with_layout(Layout::parse(layout).unwrap());
    (controller, clock)
}

#[test]
fn ten_hazards_end_the_session_on_the_next_tick() {
    let (mut session, _clock) = scripted(
        "
        @ ! ! ! ! ! ! ! ! ! ! 1
        . . . . . . . . . . . .
        # # # # # # # # # # # .
        . . . . . . . . . . . .
        . . . . . . . . . . . .
        . . . . . . . . . . . .
        . . . . . . . . . . . .
        . . . . . . . . . . . .
        . . . . . . . . . . . .
        . . . . . . . . . . . .
        . . . . . . . . . . . .
        . . . . . . . . . . . .
        ",
    );
    // Fence off row 1 so the hazards are the only way through.
    for x in 0..11 {
        session
            .state_mut()
            .terrain
            .set(Position::new(x, 1), CellType::Obstacle)
            .unwrap();
    }

    for step in 1..=10 {
        assert_eq!(
            session.tick(),
            Ok(TickReport::Moved {
                to: Position::new(step, 0),
                consumed: CellType::DamageHazard
            })
        );
    }
    assert_eq!(session.view().health, 0);
    assert_eq!(session.status(), SessionStatus::Running);

    assert_eq!(
        session.tick(),
        Ok(TickReport::Ended(Outcome::Lost(LossReason::HealthDepleted)))
    );
}

#[test]
fn collecting_every_treasure_in_order_wins() {
    let (mut session, _clock) = scripted(
        "
        @ . . . .
        . 1 . . .
        . . . . .
        . . . 2 .
        3 . . . .
        ",
    );
    let treasures = session.state().treasures.clone();
    let gold_before = session.view().gold;

    for (index, treasure) in treasures.iter().enumerate() {
        session.state_mut().agent.position = *treasure;
        let report = session.tick().unwrap();
        if index + 1 < treasures.len() {
            assert!(matches!(report, TickReport::Moved { .. }));
        } else {
            assert_eq!(report, TickReport::Ended(Outcome::Won));
        }
        assert_eq!(session.view().goal_index, index + 1);
    }

    // The board is free of gold, so only treasure bonuses count.
    assert_eq!(session.view().gold - gold_before, 300);
    assert_eq!(session.status(), SessionStatus::Ended(Outcome::Won));
}

#[test]
fn treasures_must_be_visited_in_order() {
    let (mut session, _clock) = scripted("@2.\n...\n..1");
    let mut ticks = 0;
    while session.status() == SessionStatus::Running {
        session.tick().unwrap();
        ticks += 1;
        assert!(ticks < 50, "session never finished");
    }
    // Walking past treasure 2 first does not collect it: reach 1 (4 steps),
    // collect and head back to 2 (3 steps), collect.
    assert_eq!(session.status(), SessionStatus::Ended(Outcome::Won));
    assert_eq!(session.view().gold, 200);
    assert!(session.view().visited.contains(&Position::new(2, 2)));
}

#[test]
fn reset_after_an_outcome_starts_clean() {
    let clock = ManualClock::new();
    let config = GameConfig {
        seed: Some(2024),
        ..GameConfig::default()
    };
    let mut session = SessionController::with_parts(config, AStar, clock.clone()).unwrap();

    for round in 0..10 {
        if round % 2 == 0 {
            clock.advance(Duration::from_secs(30));
        }
        while session.status() == SessionStatus::Running {
            session.tick().unwrap();
            clock.advance(Duration::from_millis(250));
        }
        session.reset();

        let state = session.state();
        let view = session.view();
        assert_eq!(state.treasures.len(), 3);
        let mut distinct = state.treasures.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 3);
        assert!(!state.treasures.contains(&view.position));
        for treasure in &state.treasures {
            assert_eq!(state.terrain.cell_at(*treasure), Ok(CellType::Treasure));
        }
        assert_ne!(state.terrain.cell_at(view.position), Ok(CellType::Obstacle));
        assert_eq!((view.health, view.gold, view.goal_index), (100, 0, 0));
        assert!(view.visited.is_empty());
        assert_eq!(view.remaining_secs, 30);
        assert_eq!(view.status, SessionStatus::Running);
    }
}

#[test]
fn stuck_agent_stays_stuck_until_time_runs_out() {
    let (mut session, clock) = scripted("@#.\n##.\n..1");
    for _ in 0..10 {
        assert!(matches!(session.tick(), Ok(TickReport::Stalled { .. })));
        clock.advance(Duration::from_secs(1));
    }
    clock.advance(Duration::from_secs(20));
    assert_eq!(
        session.tick(),
        Ok(TickReport::Ended(Outcome::Lost(LossReason::TimeUp)))
    );
}
