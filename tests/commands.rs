use frame_tracer::{CommandError, ProfileCommand};

#[test]
fn parses_the_three_verbs() {
    assert_eq!(ProfileCommand::parse("profile start"), Ok(ProfileCommand::Start));
    assert_eq!(ProfileCommand::parse("profile stop"), Ok(ProfileCommand::Stop));
    assert_eq!(ProfileCommand::parse("profile frames=120"), Ok(ProfileCommand::Frames(120)));
}

#[test]
fn keyword_is_optional_and_case_insensitive() {
    assert_eq!(ProfileCommand::parse("START"), Ok(ProfileCommand::Start));
    assert_eq!(ProfileCommand::parse("  Profile   Stop  "), Ok(ProfileCommand::Stop));
    assert_eq!(ProfileCommand::parse("FRAMES=3"), Ok(ProfileCommand::Frames(3)));
}

#[test]
fn rejects_bad_frame_counts() {
    assert_eq!(
        ProfileCommand::parse("profile frames=0"),
        Err(CommandError::InvalidFrameCount("0".to_owned())),
    );
    assert_eq!(
        ProfileCommand::parse("profile frames=-4"),
        Err(CommandError::InvalidFrameCount("-4".to_owned())),
    );
    assert_eq!(
        ProfileCommand::parse("profile frames="),
        Err(CommandError::InvalidFrameCount(String::new())),
    );
}

#[test]
fn rejects_empty_and_unknown_lines() {
    assert_eq!(ProfileCommand::parse(""), Err(CommandError::Empty));
    assert_eq!(ProfileCommand::parse("profile"), Err(CommandError::Empty));
    assert_eq!(
        ProfileCommand::parse("profile pause"),
        Err(CommandError::UnknownVerb("pause".to_owned())),
    );
    assert_eq!(
        ProfileCommand::parse("profile start now"),
        Err(CommandError::UnknownVerb("start now".to_owned())),
    );
}

#[test]
fn display_round_trips_through_from_str() {
    for command in [ProfileCommand::Start, ProfileCommand::Stop, ProfileCommand::Frames(30)] {
        let line = command.to_string();
        assert!(line.starts_with("profile "));
        assert_eq!(line.parse::<ProfileCommand>(), Ok(command));
    }
}
