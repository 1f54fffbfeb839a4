use treasure_hunt_core::{
    config::GameConfig,
    environment::Layout,
    pathfinding::AStar,
    session::{ManualClock, Outcome, SessionController, SessionStatus, TickReport},
};

const COURTYARD: &str = include_str!("../../maps/courtyard.txt");
const SEALED: &str = include_str!("../../maps/sealed.txt");

fn play(layout: &str) -> SessionController<AStar, ManualClock> {
    let config = GameConfig {
        seed: Some(3),
        ..GameConfig::default()
    };
    SessionController::with_parts(config, AStar, ManualClock::new())
        .unwrap()
        .with_layout(Layout::parse(layout).unwrap())
}

#[test]
fn courtyard_can_be_cleared() {
    let mut session = play(COURTYARD);
    assert_eq!(session.state().treasures.len(), 3);

    let mut ticks = 0;
    while session.status() == SessionStatus::Running {
        session.tick().unwrap();
        ticks += 1;
        assert!(ticks < 500, "agent wandered for too long");
    }
    assert_eq!(session.status(), SessionStatus::Ended(Outcome::Won));
    assert!(session.view().gold >= 300);
}

#[test]
fn sealed_treasure_stalls_forever() {
    let mut session = play(SEALED);
    for _ in 0..100 {
        assert!(matches!(session.tick(), Ok(TickReport::Stalled { .. })));
    }
    assert_eq!(session.status(), SessionStatus::Running);
    assert!(session.view().visited.is_empty());
}
