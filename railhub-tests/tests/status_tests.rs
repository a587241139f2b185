//! Integration Tests für Status-Snapshots, Status-LED und Reset-Taste

mod common;

use common::*;
use railhub_core::{
    Command, CommandError, HoldEvent, HoldTrigger, IndicatorState, StatusIndicator, hostname_from_device_name,
};
use rgb::RGB8;

// ============================================================================
// Tests: Snapshot
// ============================================================================

#[test]
fn test_snapshot_lists_all_outputs_by_pin() {
    let ctl = controller();
    let snapshot = ctl.snapshot(&RecordingSink::new().runtime);

    let pins: Vec<u8> = snapshot.outputs.iter().map(|o| o.pin).collect();
    assert_eq!(pins, CHANNELS.to_vec());
    assert_eq!(snapshot.name.as_str(), DEFAULT_NAME);
    assert_eq!(snapshot.mac_address.as_str(), "AA:BB:CC:DD:EE:FF");
    assert!(snapshot.chasing_groups.is_empty());
}

#[test]
fn test_execute_publishes_after_each_command() {
    let mut ctl = controller();
    let mut sink = RecordingSink::new();

    ctl.execute(
        Command::Control {
            channel: 13,
            active: true,
            brightness_percent: 25,
        },
        0,
        &mut sink,
    )
    .unwrap();
    assert_eq!(sink.snapshots.len(), 1);

    let output = &sink.last().outputs[index(13)];
    assert!(output.active);
    assert_eq!(output.brightness, 25);
    assert_eq!(output.chasing_group, None);

    ctl.execute(
        Command::CreateGroup {
            group_id: 4,
            step_interval_ms: 80,
            members: &[2, 13],
            name: None,
        },
        0,
        &mut sink,
    )
    .unwrap();
    assert_eq!(sink.snapshots.len(), 2);

    let group = &sink.last().chasing_groups[0];
    assert_eq!(group.group_id, 4);
    assert_eq!(group.name.as_str(), "Group 4");
    assert_eq!(group.interval, 80);
    assert_eq!(group.output_count, 2);
    assert_eq!(group.outputs.as_slice(), &[2, 13]);
    assert_eq!(sink.last().outputs[index(2)].chasing_group, Some(4));
}

#[test]
fn test_rejected_command_publishes_nothing() {
    let mut ctl = controller();
    let mut sink = RecordingSink::new();

    let result = ctl.execute(Command::DeleteGroup { group_id: 3 }, 0, &mut sink);

    assert_eq!(result, Err(CommandError::NotFound));
    assert!(sink.snapshots.is_empty());
}

#[test]
fn test_snapshot_json_shape() {
    let mut ctl = controller();
    let mut sink = RecordingSink::new();
    ctl.execute(
        Command::CreateGroup {
            group_id: 1,
            step_interval_ms: 100,
            members: &[4, 5],
            name: Some("Blaulicht"),
        },
        0,
        &mut sink,
    )
    .unwrap();

    let mut buf = [0u8; 2048];
    let len = serde_json_core::to_slice(sink.last(), &mut buf).unwrap();
    let json = core::str::from_utf8(&buf[..len]).unwrap();

    assert!(json.starts_with(r#"{"type":"status","name":"RailHub-Test","macAddress":"AA:BB:CC:DD:EE:FF","wifiMode":"STA""#));
    assert!(json.contains(r#"{"pin":4,"active":true,"brightness":100,"name":"","interval":0,"chasingGroup":1}"#));
    assert!(json.contains(r#"{"pin":12,"active":false,"brightness":100,"name":"","interval":0,"chasingGroup":null}"#));
    assert!(json.contains(r#""chasingGroups":[{"groupId":1,"name":"Blaulicht","interval":100,"outputCount":2,"outputs":[4,5]}]"#));
}

#[test]
fn test_device_name_and_hostname() {
    let mut ctl = controller();

    ctl.apply(Command::SetDeviceName { name: "  Anlage Süd 2 " }, 0)
        .unwrap();
    assert_eq!(ctl.device_name(), "Anlage Süd 2");
    let host: heapless::String<32> = hostname_from_device_name(ctl.device_name(), "railhub");
    assert_eq!(host.as_str(), "anlage-sd-2");

    ctl.apply(Command::SetDeviceName { name: "" }, 0).unwrap();
    assert_eq!(ctl.device_name(), DEFAULT_NAME);
}

// ============================================================================
// Tests: Status-LED
// ============================================================================

#[test]
fn test_indicator_writes_only_on_change() {
    let mut indicator = StatusIndicator::new(MockLedWriter::new(), 10);

    for now in 0..100 {
        indicator.update(IndicatorState::Connected, now);
    }
    assert_eq!(indicator.led().write_count, 1);
    assert_eq!(indicator.led().last_color, Some(RGB8::new(0, 10, 0)));

    indicator.update(IndicatorState::Connecting, 0);
    indicator.update(IndicatorState::Connecting, 500);
    assert_eq!(indicator.led().write_count, 3);
    assert_eq!(indicator.led().last_color, Some(RGB8::default()));
}

#[test]
fn test_indicator_retries_after_failed_write() {
    let mut led = MockLedWriter::new();
    led.fail_next_write = true;
    let mut indicator = StatusIndicator::new(led, 10);

    indicator.update(IndicatorState::Connected, 0);
    assert_eq!(indicator.led().write_count, 0);
    indicator.update(IndicatorState::Connected, 1);
    assert_eq!(indicator.led().write_count, 1);
}

// ============================================================================
// Tests: Reset-Taste
// ============================================================================

#[test]
fn test_hold_trigger_fires_after_threshold() {
    let mut trigger = HoldTrigger::new(3000, 2500);
    let mut events = Vec::new();

    for now in (0..=3200).step_by(100) {
        match trigger.sample(true, now) {
            HoldEvent::Holding { .. } => {}
            event => events.push((now, event)),
        }
    }

    assert_eq!(
        events,
        vec![
            (0, HoldEvent::Pressed),
            (2500, HoldEvent::Warning { held_ms: 2500 }),
            (3000, HoldEvent::Triggered),
        ]
    );
}

#[test]
fn test_hold_trigger_release_cancels() {
    let mut trigger = HoldTrigger::new(3000, 2500);
    trigger.sample(true, 1000);
    assert_eq!(trigger.sample(true, 3999), HoldEvent::Warning { held_ms: 2999 });
    assert_eq!(trigger.sample(false, 4000), HoldEvent::Released { held_ms: 3000 });
    assert_eq!(trigger.held_ms(4000), None);

    // Neuer Druck beginnt wieder bei 0
    trigger.sample(true, 5000);
    assert_eq!(trigger.sample(true, 7000), HoldEvent::Holding { held_ms: 2000 });
}
