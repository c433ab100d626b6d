//! Generator lifecycle integration tests
//!
//! Drives the manager end to end against the device model through the
//! recording gateway.

use std::time::Duration;

use pktgen_table::schema::{app_cfg, pkt_buffer, port_cfg, APP_CFG_TABLE, PKT_BUFFER_TABLE, PORT_CFG_TABLE};
use pktgen_table::{FieldValue, ReadMode, TableKey};
use pktgen_test::{app_fixtures, Fault, TableOp, TableVerifier, TestBench};
use pktgen_types::{MacAddress, PortRange};
use pktgenmgrd::frames::{buffer_payload, expected_frame_count, expected_frames};
use pktgenmgrd::{
    AppState, Counters, GeneratorConfig, GeneratorManagerConfig, PktgenError, TriggerKind,
};
use pretty_assertions::assert_eq;

fn app_key(app_id: u64) -> TableKey {
    TableKey::single(app_cfg::APP_ID, app_id)
}

fn port_key(port: u64) -> TableKey {
    TableKey::single(port_cfg::DEV_PORT, port)
}

/// Scenario:
/// 1. Program app 1 on port 68, ONE_SHOT after 1 s, one 100-byte packet
/// 2. Verify all three tables
/// 3. Start, advance 1 s, read one trigger/batch/packet
#[test]
fn test_one_shot_scenario() {
    let bench = TestBench::new();
    let scenario = app_fixtures::one_shot_default();
    scenario.apply(&bench.manager).unwrap();

    let verifier = TableVerifier::new(&bench.device);
    verifier
        .assert_field_value(PORT_CFG_TABLE, &port_key(68), port_cfg::PKTGEN_ENABLE, true)
        .unwrap();
    verifier
        .assert_data_type(APP_CFG_TABLE, &app_key(1), "trigger_timer_one_shot")
        .unwrap();
    for (field, value) in [
        (app_cfg::TIMER_NANOSEC, 1_000_000_000u64),
        (app_cfg::PKT_LEN, 94),
        (app_cfg::PKT_BUFFER_OFFSET, 144),
        (app_cfg::PIPE_LOCAL_SOURCE_PORT, 68),
        (app_cfg::BATCH_COUNT_CFG, 0),
        (app_cfg::PACKETS_PER_BATCH_CFG, 0),
    ] {
        verifier
            .assert_field_value(APP_CFG_TABLE, &app_key(1), field, value)
            .unwrap();
    }
    verifier
        .assert_field_value(APP_CFG_TABLE, &app_key(1), app_cfg::APP_ENABLE, false)
        .unwrap();

    let buffer_key = TableKey::single(pkt_buffer::PKT_BUFFER_OFFSET, 144)
        .with(pkt_buffer::PKT_BUFFER_SIZE, 94);
    let bytes = verifier.buffer_bytes(&buffer_key).unwrap();
    assert_eq!(bytes, buffer_payload(&scenario.config).unwrap());

    assert_eq!(bench.manager.get_report(1).unwrap(), Counters::default());

    bench.manager.start(1).unwrap();
    bench.device.advance(Duration::from_millis(999));
    assert_eq!(bench.manager.get_report(1).unwrap(), Counters::default());

    bench.device.advance(Duration::from_millis(1));
    let expected = Counters {
        batch_counter: 1,
        pkt_counter: 1,
        trigger_counter: 1,
    };
    assert_eq!(bench.manager.get_report(1).unwrap(), expected);

    // one shot: no further triggers
    bench.device.advance(Duration::from_secs(5));
    assert_eq!(bench.manager.get_report(1).unwrap(), expected);

    bench.manager.stop(1).unwrap();
    assert_eq!(bench.manager.app_state(1), AppState::Stopped);
    assert_eq!(bench.manager.get_app_port(1).unwrap(), 68);
}

#[test]
fn test_port_written_once_across_apps() {
    let bench = TestBench::new();
    let first = app_fixtures::one_shot_default();
    let mut config = GeneratorConfig::new();
    config.set_packet_buffer_offset(1024);
    let second = app_fixtures::port_down(2, 68).with_config(config);

    first.apply(&bench.manager).unwrap();
    second.apply(&bench.manager).unwrap();

    bench
        .gateway
        .assert_call_count(PORT_CFG_TABLE, TableOp::Add, 1)
        .unwrap();
    let verifier = TableVerifier::new(&bench.device);
    verifier.assert_entry_count(PORT_CFG_TABLE, 1).unwrap();
    verifier.assert_entry_count(APP_CFG_TABLE, 2).unwrap();
    verifier.assert_entry_count(PKT_BUFFER_TABLE, 2).unwrap();
}

#[test]
fn test_add_then_modify() {
    let bench = TestBench::new();
    let scenario = app_fixtures::one_shot_default();
    scenario.apply(&bench.manager).unwrap();

    let mut updated = scenario.config.clone();
    updated.set_inter_packet_gap(100, 10);
    app_fixtures::one_shot_default()
        .with_config(updated)
        .apply(&bench.manager)
        .unwrap();

    bench
        .gateway
        .assert_call_count(APP_CFG_TABLE, TableOp::Add, 1)
        .unwrap();
    let modifies = bench.gateway.calls_to(APP_CFG_TABLE, TableOp::Modify);
    assert_eq!(modifies.len(), 1);
    assert_eq!(
        modifies[0].data_type.as_deref(),
        Some("trigger_timer_one_shot")
    );

    TableVerifier::new(&bench.device)
        .assert_field_value(APP_CFG_TABLE, &app_key(1), app_cfg::IPG, 100u64)
        .unwrap();
}

#[test]
fn test_start_stop_write_only_enable() {
    let bench = TestBench::new();
    app_fixtures::periodic(4, 70, 1_000, 2, 3)
        .unwrap()
        .apply(&bench.manager)
        .unwrap();
    bench.gateway.clear_calls();

    bench.manager.start(4).unwrap();
    bench.manager.stop(4).unwrap();

    let modifies = bench.gateway.calls_to(APP_CFG_TABLE, TableOp::Modify);
    assert_eq!(modifies.len(), 2);
    for (call, enable) in modifies.iter().zip([true, false]) {
        assert_eq!(call.key, app_key(4));
        assert_eq!(call.data_type.as_deref(), Some("trigger_timer_periodic"));
        assert_eq!(
            call.fields,
            vec![(app_cfg::APP_ENABLE.to_string(), FieldValue::Bool(enable))]
        );
    }
}

#[test]
fn test_lifecycle_misuse() {
    let bench = TestBench::new();
    let mgr = &bench.manager;

    assert_eq!(mgr.app_state(1), AppState::Unregistered);
    assert!(matches!(mgr.start(1), Err(PktgenError::NotRegistered(1))));
    assert!(matches!(mgr.get_report(1), Err(PktgenError::NotRegistered(1))));
    assert!(matches!(mgr.get_app_port(1), Err(PktgenError::NotRegistered(1))));

    app_fixtures::one_shot_default().apply(mgr).unwrap();
    assert_eq!(mgr.app_state(1), AppState::Configured);
    assert!(matches!(mgr.stop(1), Err(PktgenError::NotRunning(1))));

    mgr.start(1).unwrap();
    assert!(matches!(mgr.start(1), Err(PktgenError::AlreadyRunning(1))));

    // misuse never reaches the device
    bench
        .gateway
        .assert_call_count(APP_CFG_TABLE, TableOp::Modify, 1)
        .unwrap();
}

#[test]
fn test_periodic_counters_accumulate() {
    let bench = TestBench::new();
    app_fixtures::periodic(2, 69, 1_000_000, 2, 5)
        .unwrap()
        .apply(&bench.manager)
        .unwrap();

    bench.manager.start(2).unwrap();
    bench.device.advance(Duration::from_millis(3));
    let counters = bench.manager.get_report(2).unwrap();
    assert_eq!(
        counters,
        Counters {
            batch_counter: 6,
            pkt_counter: 30,
            trigger_counter: 3,
        }
    );

    // stopped apps keep their counters
    bench.manager.stop(2).unwrap();
    bench.device.advance(Duration::from_millis(10));
    assert_eq!(bench.manager.get_report(2).unwrap(), counters);
    bench
        .gateway
        .assert_call_count(APP_CFG_TABLE, TableOp::Get(ReadMode::Hardware), 2)
        .unwrap();
}

#[test]
fn test_event_trigger_never_fires_in_model() {
    let bench = TestBench::new();
    app_fixtures::port_down(3, 71).apply(&bench.manager).unwrap();
    bench.manager.start(3).unwrap();
    bench.device.advance(Duration::from_secs(60));
    assert_eq!(bench.manager.get_report(3).unwrap(), Counters::default());
}

#[test]
fn test_port_out_of_range() {
    let bench = TestBench::new();
    let err = app_fixtures::port_down(1, 8).apply(&bench.manager).unwrap_err();
    assert!(matches!(err, PktgenError::PortOutOfRange { port: 8, .. }));
    assert!(bench.gateway.calls().is_empty());

    let tofino2 = TestBench::with_ports(PortRange::TOFINO2);
    app_fixtures::port_down(1, 7).apply(&tofino2.manager).unwrap();
    assert!(app_fixtures::port_down(2, 68).apply(&tofino2.manager).is_err());
}

#[test]
fn test_unsupported_trigger() {
    let err = "trigger_sometimes".parse::<TriggerKind>().unwrap_err();
    assert!(matches!(err, PktgenError::UnsupportedTrigger(ref t) if t == "trigger_sometimes"));
}

#[test]
fn test_port_enable_not_taking_effect() {
    let bench = TestBench::new();
    bench.gateway.inject(Fault::DropPortEnable);

    let err = app_fixtures::one_shot_default()
        .apply(&bench.manager)
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(bench.gateway.calls_to(APP_CFG_TABLE, TableOp::Add).is_empty());
    assert_eq!(bench.manager.app_state(1), AppState::Unregistered);
}

#[test]
fn test_write_verification_detects_mismatch() {
    let bench = TestBench::new();
    bench.gateway.inject(Fault::CorruptAppField {
        field: app_cfg::PKT_LEN.to_string(),
        value: FieldValue::Int(100),
    });

    let err = app_fixtures::one_shot_default()
        .apply(&bench.manager)
        .unwrap_err();
    match err {
        PktgenError::HardwareMismatch {
            field,
            expected,
            actual,
            ..
        } => {
            assert_eq!(field, app_cfg::PKT_LEN);
            assert_eq!(expected, "94");
            assert_eq!(actual, "100");
        }
        other => panic!("unexpected error: {other}"),
    }
    // no buffer is programmed after a failed verification
    assert!(bench.gateway.calls_to(PKT_BUFFER_TABLE, TableOp::Add).is_empty());
}

#[test]
fn test_set_app_retry_after_buffer_failure() {
    let bench = TestBench::new();
    bench.gateway.inject(Fault::Unreachable {
        table: PKT_BUFFER_TABLE.to_string(),
    });

    let scenario = app_fixtures::one_shot_default();
    match scenario.apply(&bench.manager).unwrap_err() {
        PktgenError::Gateway(e) => assert!(e.is_retryable()),
        other => panic!("unexpected error: {other}"),
    }
    // the application entry was written before the buffer failed
    assert_eq!(bench.manager.app_state(1), AppState::Configured);

    bench.gateway.clear_faults();
    bench.gateway.clear_calls();
    scenario.apply(&bench.manager).unwrap();

    bench
        .gateway
        .assert_call_count(APP_CFG_TABLE, TableOp::Add, 0)
        .unwrap();
    bench
        .gateway
        .assert_call_count(APP_CFG_TABLE, TableOp::Modify, 1)
        .unwrap();
    let verifier = TableVerifier::new(&bench.device);
    verifier.assert_entry_count(APP_CFG_TABLE, 1).unwrap();
    verifier.assert_entry_count(PKT_BUFFER_TABLE, 1).unwrap();

    bench.manager.start(1).unwrap();
    bench.device.advance(Duration::from_secs(1));
    assert_eq!(bench.manager.get_report(1).unwrap().pkt_counter, 1);
}

#[test]
fn test_set_app_retry_after_verification_failure() {
    let bench = TestBench::new();
    bench.gateway.inject(Fault::CorruptAppField {
        field: app_cfg::PKT_LEN.to_string(),
        value: FieldValue::Int(100),
    });
    let scenario = app_fixtures::one_shot_default();
    assert!(scenario.apply(&bench.manager).unwrap_err().is_fatal());

    bench.gateway.clear_faults();
    scenario.apply(&bench.manager).unwrap();
    TableVerifier::new(&bench.device)
        .assert_entry_count(PKT_BUFFER_TABLE, 1)
        .unwrap();
}

#[test]
fn test_verification_can_be_disabled() {
    let bench = TestBench::with_config(GeneratorManagerConfig {
        generator_ports: PortRange::TOFINO,
        verify_writes: false,
    });
    bench.gateway.inject(Fault::CorruptAppField {
        field: app_cfg::PKT_LEN.to_string(),
        value: FieldValue::Int(100),
    });

    app_fixtures::one_shot_default()
        .apply(&bench.manager)
        .unwrap();
    bench
        .gateway
        .assert_call_count(APP_CFG_TABLE, TableOp::Get(ReadMode::Cache), 0)
        .unwrap();
}

#[test]
fn test_gateway_errors_pass_through() {
    let bench = TestBench::new();
    app_fixtures::one_shot_default()
        .apply(&bench.manager)
        .unwrap();
    bench.gateway.inject(Fault::Unreachable {
        table: APP_CFG_TABLE.to_string(),
    });

    match bench.manager.start(1).unwrap_err() {
        PktgenError::Gateway(e) => assert!(e.is_retryable()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(bench.manager.app_state(1), AppState::Configured);

    bench.gateway.clear_faults();
    bench.manager.start(1).unwrap();
}

#[test]
fn test_expected_frames_carry_timer_header() {
    let scenario = app_fixtures::periodic(2, 68, 1_000, 2, 3).unwrap();
    let frames: Vec<_> = expected_frames(&scenario.config, 0, 2).unwrap().collect();
    assert_eq!(frames.len() as u64, expected_frame_count(&scenario.config));
    assert_eq!(frames.len(), 6);

    let last = &frames[5];
    assert_eq!(last.len(), 100);
    assert_eq!(&last[..6], MacAddress::timer_header(0, 2, 1, 2).as_bytes());
}
