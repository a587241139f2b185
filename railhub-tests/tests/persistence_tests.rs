//! Integration Tests für die Persistenz
//!
//! MockFlash simuliert den Flash-Bereich, `reboot()` startet einen neuen
//! Controller auf demselben Inhalt.

mod common;

use common::*;
use railhub_core::{Command, GroupId, RECORD_SIZE, Record, RecordStore, RuntimeInfo, StorageError};

fn configure(ctl: &mut TestController) {
    ctl.apply(
        Command::Control {
            channel: 4,
            active: true,
            brightness_percent: 30,
        },
        0,
    )
    .unwrap();
    ctl.apply(
        Command::SetInterval {
            channel: 4,
            interval_ms: 500,
        },
        0,
    )
    .unwrap();
    ctl.apply(
        Command::RenameOutput {
            channel: 16,
            name: "Bahnsteig",
        },
        0,
    )
    .unwrap();
    ctl.apply(
        Command::CreateGroup {
            group_id: 9,
            step_interval_ms: 120,
            members: &[14, 12, 13],
            name: Some("Baustelle"),
        },
        0,
    )
    .unwrap();
    ctl.apply(Command::SetDeviceName { name: "Anlage Keller" }, 0)
        .unwrap();
}

fn load_record(ctl: &TestController) -> Result<Record, StorageError> {
    let flash = MockFlash::from_bytes(ctl.store().storage().data.clone());
    RecordStore::new(flash, RECORD_OFFSET).load(OUTPUT_COUNT)
}

// ============================================================================
// Tests: Boot
// ============================================================================

#[test]
fn test_erased_flash_yields_defaults() {
    let ctl = controller();

    assert_eq!(ctl.device_name(), DEFAULT_NAME);
    assert!(ctl.groups().is_empty());
    for output in ctl.outputs().iter() {
        assert!(!output.active);
        assert_eq!(output.level, 255);
        assert_eq!(output.blink_interval_ms, 0);
        assert_eq!(output.group, None);
        assert!(output.name.is_empty());
    }
    assert!(ctl.pwm().lit().is_empty());
}

#[test]
fn test_defaults_are_written_on_first_boot() {
    let ctl = controller();

    assert_eq!(ctl.store().storage().write_count, 1);
    let record = load_record(&ctl).unwrap();
    assert_eq!(record, Record::defaults(DEFAULT_NAME));
}

#[test]
fn test_corrupt_record_is_replaced_by_defaults() {
    let mut ctl = controller();
    configure(&mut ctl);

    let mut data = ctl.store().storage().data.clone();
    data[100] ^= 0xA5;
    let rebooted = controller_with_flash(MockFlash::from_bytes(data));

    assert_eq!(rebooted.device_name(), DEFAULT_NAME);
    assert!(rebooted.groups().is_empty());
    assert!(rebooted.outputs().iter().all(|o| !o.active));
    assert_eq!(load_record(&rebooted).unwrap(), Record::defaults(DEFAULT_NAME));
}

// ============================================================================
// Tests: Round-Trip
// ============================================================================

#[test]
fn test_round_trip_restores_outputs_and_groups() {
    let mut ctl = controller();
    configure(&mut ctl);

    let rebooted = reboot(&ctl, 5000);

    assert_eq!(rebooted.device_name(), "Anlage Keller");
    for (before, after) in ctl.outputs().iter().zip(rebooted.outputs().iter()) {
        assert_eq!(before.channel, after.channel);
        assert_eq!(before.active, after.active);
        assert_eq!(before.level, after.level);
        assert_eq!(before.blink_interval_ms, after.blink_interval_ms);
        assert_eq!(before.name, after.name);
        assert_eq!(before.group, after.group);
    }

    let id = GroupId::new(9).unwrap();
    let before = ctl.groups().get(id).unwrap();
    let after = rebooted.groups().get(id).unwrap();
    assert_eq!(before.name, after.name);
    assert_eq!(before.members, after.members);
    assert_eq!(before.step_interval_ms, after.step_interval_ms);

    assert_eq!(
        ctl.snapshot(&RuntimeInfo::default()),
        rebooted.snapshot(&RuntimeInfo::default())
    );
}

#[test]
fn test_round_trip_keeps_inactive_group_member() {
    let mut ctl = controller();
    ctl.apply(
        Command::CreateGroup {
            group_id: 1,
            step_interval_ms: 200,
            members: &[4, 5],
            name: None,
        },
        0,
    )
    .unwrap();
    ctl.apply(
        Command::Control {
            channel: 5,
            active: false,
            brightness_percent: 60,
        },
        0,
    )
    .unwrap();

    let mut rebooted = reboot(&ctl, 1000);

    let member = rebooted.outputs().get(index(5)).unwrap();
    assert!(!member.active);
    assert_eq!(member.level, 153);
    assert_eq!(member.group, GroupId::new(1));
    assert!(rebooted.outputs().get(index(4)).unwrap().active);
    assert_eq!(
        ctl.snapshot(&RuntimeInfo::default()),
        rebooted.snapshot(&RuntimeInfo::default())
    );

    // Lauflicht schaltet das Mitglied trotzdem weiter
    rebooted.tick(1200);
    assert_eq!(rebooted.pwm().levels[index(4)], 0);
    assert_eq!(rebooted.pwm().levels[index(5)], 153);
}

#[test]
fn test_restore_drives_outputs() {
    let mut ctl = controller();
    configure(&mut ctl);
    let mut rebooted = reboot(&ctl, 5000);

    // Blinkender Output startet in der An-Phase
    assert_eq!(rebooted.pwm().levels[index(4)], 77);
    // Gruppe startet mit dem ersten Mitglied
    assert_eq!(rebooted.pwm().levels[index(14)], 255);
    assert_eq!(rebooted.pwm().levels[index(12)], 0);
    assert_eq!(rebooted.pwm().levels[index(13)], 0);
    assert_eq!(rebooted.groups().iter().next().unwrap().current_step(), 0);

    // Timer laufen ab dem Boot-Zeitpunkt
    rebooted.tick(5119);
    assert_eq!(rebooted.pwm().levels[index(14)], 255);
    rebooted.tick(5120);
    assert_eq!(rebooted.pwm().levels[index(12)], 255);
    rebooted.tick(5500);
    assert_eq!(rebooted.pwm().levels[index(4)], 0);
}

#[test]
fn test_single_output_update_keeps_rest_of_record() {
    let mut ctl = controller();
    configure(&mut ctl);
    let before = load_record(&ctl).unwrap();

    ctl.apply(Command::RenameOutput { channel: 5, name: "Weiche" }, 0)
        .unwrap();
    let after = load_record(&ctl).unwrap();

    assert_eq!(after.outputs[index(5)].name.as_str(), "Weiche");
    for i in (0..OUTPUT_COUNT).filter(|&i| i != index(5)) {
        assert_eq!(after.outputs[i], before.outputs[i]);
    }
    assert_eq!(after.groups, before.groups);
    assert_eq!(after.device_name, before.device_name);
}

#[test]
fn test_deleted_group_is_not_restored() {
    let mut ctl = controller();
    configure(&mut ctl);
    ctl.apply(Command::DeleteGroup { group_id: 9 }, 0).unwrap();

    let rebooted = reboot(&ctl, 0);
    assert!(rebooted.groups().is_empty());
    for channel in [12, 13, 14] {
        let output = rebooted.outputs().get(index(channel)).unwrap();
        assert!(!output.active);
        assert_eq!(output.group, None);
    }
}

// ============================================================================
// Tests: Reset
// ============================================================================

#[test]
fn test_reset_storage_keeps_live_state() {
    let mut ctl = controller();
    configure(&mut ctl);
    let live = ctl.snapshot(&RuntimeInfo::default());

    ctl.apply(Command::ResetStorage, 0).unwrap();

    assert_eq!(ctl.snapshot(&RuntimeInfo::default()), live);
    assert_eq!(load_record(&ctl), Err(StorageError::Blank));

    let rebooted = reboot(&ctl, 0);
    assert_eq!(rebooted.device_name(), DEFAULT_NAME);
    assert!(rebooted.groups().is_empty());
}

#[test]
fn test_update_after_reset_starts_from_defaults() {
    let mut ctl = controller();
    configure(&mut ctl);
    ctl.apply(Command::ResetStorage, 0).unwrap();

    ctl.apply(Command::RenameOutput { channel: 2, name: "Laterne" }, 0)
        .unwrap();

    let record = load_record(&ctl).unwrap();
    assert_eq!(record.outputs[index(2)].name.as_str(), "Laterne");
    assert!(record.groups.iter().all(Option::is_none));
    assert_eq!(record.device_name.as_str(), DEFAULT_NAME);
}

#[test]
fn test_factory_reset_erases_record_and_switches_off() {
    let mut ctl = controller();
    configure(&mut ctl);

    ctl.factory_reset().unwrap();

    assert!(ctl.pwm().lit().is_empty());
    assert_eq!(load_record(&ctl), Err(StorageError::Blank));
}

#[test]
fn test_flash_write_failure_keeps_live_state() {
    let mut flash = MockFlash::new();
    flash.fail_writes = true;
    let mut ctl = controller_with_flash(flash);

    ctl.apply(
        Command::Control {
            channel: 4,
            active: true,
            brightness_percent: 100,
        },
        0,
    )
    .unwrap();

    assert!(ctl.outputs().get(0).unwrap().active);
    assert_eq!(ctl.pwm().levels[0], 255);
    assert_eq!(ctl.store().storage().write_count, 0);
}

#[test]
fn test_record_size_fits_flash_sector() {
    assert_eq!(RECORD_SIZE, 372);
    assert!(RECORD_SIZE <= FLASH_SIZE);
}
