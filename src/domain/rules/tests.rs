// Unit tests for domain rules

use super::*;
use crate::error::ErrorKind;

fn action_at(offset: f64, sector: ActionSector, fault: ActionFault) -> Action {
    Action::from_new(NewAction::new(offset, sector, fault))
}

#[test]
fn test_game_number_accepts_plain_names() {
    assert!(GameNumberRules::validate("2024-01").is_ok());
    assert!(GameNumberRules::validate("Coupe de France 12").is_ok());
}

#[test]
fn test_game_number_rejects_path_tricks() {
    for bad in ["", "   ", "..", ".hidden", "a/b", "a\\b", "x:y", "CON", "lpt1.mp4", " 12"] {
        let err = GameNumberRules::validate(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest, "accepted {:?}", bad);
    }
}

#[test]
fn test_action_offset_rejected_beyond_known_duration() {
    let action = NewAction::new(601.0, ActionSector::Attack, ActionFault::NetTouch);
    let err = ActionRules::validate(&action, Some(600.0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);

    // Unknown duration keeps the permissive behavior
    assert!(ActionRules::validate(&action, None).is_ok());
}

#[test]
fn test_action_negative_offset_always_rejected() {
    let action = NewAction::new(-1.0, ActionSector::Serve, ActionFault::FootFault);
    assert_eq!(
        ActionRules::validate(&action, None).unwrap_err().kind(),
        ErrorKind::InvalidRange
    );
    let action = NewAction::new(f64::NAN, ActionSector::Serve, ActionFault::FootFault);
    assert!(ActionRules::validate(&action, None).is_err());
}

#[test]
fn test_action_fault_must_match_sector() {
    let action = NewAction::new(5.0, ActionSector::Serve, ActionFault::BackRowBlock);
    assert_eq!(
        ActionRules::validate(&action, Some(60.0)).unwrap_err().kind(),
        ErrorKind::InvalidRequest
    );
}

#[test]
fn test_range_validation() {
    assert!(RangeRules::validate(&TimeRange::new(1.0, 5.0), 10.0).is_ok());
    assert!(RangeRules::validate(&TimeRange::new(0.0, 10.0), 10.0).is_ok());

    for bad in [
        TimeRange::new(5.0, 5.0),
        TimeRange::new(6.0, 5.0),
        TimeRange::new(-0.5, 5.0),
        TimeRange::new(1.0, 10.5),
        TimeRange::new(f64::NAN, 2.0),
    ] {
        assert_eq!(
            RangeRules::validate(&bad, 10.0).unwrap_err().kind(),
            ErrorKind::InvalidRange
        );
    }
}

#[test]
fn test_clip_windows_are_chronological_and_clamped() {
    let planner = ClipWindowPlanner::new(5.0, 3.0);
    let actions = vec![
        action_at(100.0, ActionSector::Block, ActionFault::Touch),
        action_at(2.0, ActionSector::Serve, ActionFault::FootFault),
        action_at(59.0, ActionSector::Attack, ActionFault::BallOut),
    ];

    let windows = planner.plan(&actions, Some(60.0));

    // The action at 100s lies beyond the video and yields no window
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0].range, TimeRange::new(0.0, 5.0));
    assert_eq!(windows[0].sector, ActionSector::Serve);
    assert_eq!(windows[1].range, TimeRange::new(54.0, 60.0));
}

#[test]
fn test_clip_windows_merge_overlapping_actions() {
    let planner = ClipWindowPlanner::new(5.0, 3.0);
    let first = action_at(20.0, ActionSector::Attack, ActionFault::NetTouch);
    let second = action_at(24.0, ActionSector::Block, ActionFault::NetTouch);
    let third = action_at(40.0, ActionSector::Defense, ActionFault::Catch);

    let windows = planner.plan(&[third.clone(), first.clone(), second.clone()], None);

    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0].range, TimeRange::new(15.0, 27.0));
    assert_eq!(windows[0].action_ids, vec![first.id, second.id]);
    assert_eq!(windows[1].action_ids, vec![third.id]);
}
