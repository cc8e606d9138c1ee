use rx_combine::*;
use std::time::Duration;

#[test]
fn test_animation_config_defaults() {
    let config = AnimationConfig::default();
    assert_eq!(config.duration, Duration::from_millis(300));
    assert_eq!(config.delay, Duration::ZERO);

    let custom = AnimationConfig::new(Duration::from_secs(1)).with_delay(Duration::from_millis(250));
    assert_eq!(custom.duration, Duration::from_secs(1));
    assert_eq!(custom.delay, Duration::from_millis(250));
}

#[test]
fn test_animation_config_from_json_fills_missing_fields() {
    let config = AnimationConfig::from_json(r#"{ "delay": { "secs": 0, "nanos": 500000000 } }"#).unwrap();
    assert_eq!(config.duration, Duration::from_millis(300));
    assert_eq!(config.delay, Duration::from_millis(500));
}

#[test]
fn test_sink_config_from_json() {
    let config = SinkConfig::from_json(r#"{ "label": "filters", "trace_values": true }"#).unwrap();
    assert_eq!(config.label, "filters");
    assert!(config.trace_values);

    assert_eq!(SinkConfig::from_json("{}").unwrap(), SinkConfig::default());
}

#[test]
fn test_invalid_config_is_reported() {
    match AnimationConfig::from_json("{ \"duration\": \"soon\" }") {
        Err(StreamError::Config(message)) => assert!(!message.is_empty()),
        other => panic!("expected a config error, got {:?}", other),
    }
}
