use vcu_config::load_toml;

#[test]
fn rejects_zero_tick() {
    let toml = r#"
[scheduler]
tick_ms = 0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject tick_ms=0");
    assert!(format!("{err}").contains("tick_ms must be >= 1"));
}

#[test]
fn rejects_task_period_below_tick() {
    let toml = r#"
[scheduler]
tick_ms = 10
motor_tx_ms = 5
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject sub-tick period");
    assert!(format!("{err}").contains("motor_tx_ms must be >= scheduler.tick_ms"));
}

#[test]
fn rejects_inverted_plausibility_window() {
    let toml = r#"
[pedal]
apps_low = 950
apps_high = 30
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject inverted bounds");
    assert!(format!("{err}").contains("apps_low must be < pedal.apps_high"));
}

#[test]
fn rejects_out_of_range_diff_threshold() {
    let toml = r#"
[pedal]
diff_threshold_tenths = 1500
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_zero_bms_timeout_when_enabled() {
    let toml = r#"
[bms]
enabled = true
timeout_ms = 0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    assert!(cfg.validate().is_err());

    let toml = r#"
[bms]
enabled = false
timeout_ms = 0
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("timeout is irrelevant when disabled");
}

#[test]
fn empty_document_gives_valid_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.scheduler.tick_ms, 1);
    assert_eq!(cfg.pedal.diff_threshold_tenths, 100);
    assert_eq!(cfg.pedal.diff_trip_ms, 100);
    assert_eq!(cfg.pedal.latch_clear_ticks, 2);
    assert_eq!(cfg.car.starting_ms, 2000);
    assert_eq!(cfg.car.brake_threshold, 130);
    assert!(cfg.throttle_table.is_empty());
}

#[test]
fn inline_tables_accept_pairs_and_tables() {
    let toml = r#"
throttle_table = [[60, 0], [900, 32500]]

[[brake_table]]
raw = 60
torque = 0

[[brake_table]]
raw = 900
torque = -32500
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid tables");
    assert_eq!(cfg.throttle_table.len(), 2);
    assert_eq!(cfg.throttle_table[1].torque, 32500);
    assert_eq!(cfg.brake_table[1].torque, -32500);
}

#[test]
fn inline_table_must_be_strictly_increasing() {
    let toml = r#"
throttle_table = [[60, 0], [60, 100], [900, 32500]]
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("duplicate raw must fail");
    assert!(format!("{err}").contains("strictly increasing"));
}

#[test]
fn full_document_round_trips() {
    let toml = r#"
[scheduler]
tick_ms = 1
motor_tx_ms = 10
telemetry_ms = 10
bms_poll_ms = 100

[pedal]
diff_threshold_tenths = 100
diff_trip_ms = 100
latch_clear_ticks = 2
filter = "exponential"
regen_enabled = true

[car]
starting_ms = 2000
bussing_ms = 2000
brake_threshold = 130

[bms]
enabled = true
timeout_ms = 500

[telemetry]
state_every = 10
adc_digital_ratio = 2

[logging]
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.pedal.filter, vcu_config::PedalFilter::Exponential);
    assert!(cfg.pedal.regen_enabled);
    assert_eq!(cfg.logging.level.as_deref(), Some("debug"));
}
