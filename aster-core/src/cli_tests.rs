use super::*;

#[test]
fn log_level_maps_onto_level_filter() {
    assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::Trace);
    assert_eq!(LevelFilter::from(LogLevel::Info), LevelFilter::Info);
    assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::Off);
}

#[test]
fn defaults_to_info_with_no_arguments() {
    let args = EngineArgs::try_parse_from(["demo"]).unwrap();
    assert!(matches!(args.log_level, LogLevel::Info));
    assert!(args.args.is_empty());
}

#[test]
fn log_level_parses_from_both_flag_forms() {
    let long = EngineArgs::try_parse_from(["demo", "--log-level", "debug"]).unwrap();
    assert!(matches!(long.log_level, LogLevel::Debug));

    let short = EngineArgs::try_parse_from(["demo", "-l", "trace"]).unwrap();
    assert!(matches!(short.log_level, LogLevel::Trace));
}

#[test]
fn trailing_arguments_pass_through_to_the_application() {
    let args = EngineArgs::try_parse_from(["demo", "scene.gltf", "--fast"]).unwrap();
    assert_eq!(args.args, ["scene.gltf", "--fast"]);
}
