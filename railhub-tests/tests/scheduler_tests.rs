//! Integration Tests für den Tick Scheduler
//!
//! Simulierte Zeit: Jeder Test ruft `tick()` mit selbst gewählten
//! Zeitstempeln auf.

mod common;

use common::*;
use railhub_core::Command;

fn chase(ctl: &mut TestController, members: &[u8], step_interval_ms: u16, now_ms: u32) {
    ctl.apply(
        Command::CreateGroup {
            group_id: 1,
            step_interval_ms,
            members,
            name: Some("Lauflicht"),
        },
        now_ms,
    )
    .unwrap();
}

fn switch_on(ctl: &mut TestController, channel: u8, brightness_percent: i32, now_ms: u32) {
    ctl.apply(
        Command::Control {
            channel,
            active: true,
            brightness_percent,
        },
        now_ms,
    )
    .unwrap();
}

// ============================================================================
// Tests: Lauflicht
// ============================================================================

#[test]
fn test_chasing_cycles_through_members() {
    let mut ctl = controller();
    chase(&mut ctl, &[4, 5, 12], 100, 0);
    assert_eq!(ctl.pwm().lit(), vec![0]);

    let mut now = 0;
    for expected in [1, 2, 0, 1] {
        now += 100;
        ctl.tick(now);
        assert_eq!(ctl.pwm().lit(), vec![expected], "t={now}");
    }
}

#[test]
fn test_exactly_one_member_lit_between_steps() {
    let mut ctl = controller();
    chase(&mut ctl, &[4, 5, 12], 100, 0);

    for now in (0..=1000).step_by(7) {
        ctl.tick(now);
        assert_eq!(ctl.pwm().lit().len(), 1, "t={now}");
    }
}

#[test]
fn test_no_step_before_interval() {
    let mut ctl = controller();
    chase(&mut ctl, &[4, 5], 250, 1000);

    ctl.tick(1249);
    assert_eq!(ctl.groups().iter().next().unwrap().current_step(), 0);
    ctl.tick(1250);
    assert_eq!(ctl.groups().iter().next().unwrap().current_step(), 1);
}

#[test]
fn test_chasing_uses_member_brightness() {
    let mut ctl = controller();
    switch_on(&mut ctl, 5, 40, 0);
    chase(&mut ctl, &[4, 5], 100, 0);

    ctl.tick(100);
    assert_eq!(ctl.pwm().levels[index(5)], 102);
    assert_eq!(ctl.pwm().levels[index(4)], 0);
}

#[test]
fn test_chasing_ignores_member_active_flag() {
    let mut ctl = controller();
    chase(&mut ctl, &[4, 5], 100, 0);
    ctl.apply(
        Command::Control {
            channel: 5,
            active: false,
            brightness_percent: 100,
        },
        0,
    )
    .unwrap();

    ctl.tick(100);
    assert_eq!(ctl.pwm().lit(), vec![index(5)]);
}

#[test]
fn test_chasing_across_timer_wraparound() {
    let start = u32::MAX - 50;
    let mut ctl = controller();
    chase(&mut ctl, &[4, 5, 12], 100, start);

    // 99ms nach dem Start, Zähler ist übergelaufen
    ctl.tick(start.wrapping_add(99));
    assert_eq!(ctl.pwm().lit(), vec![0]);

    ctl.tick(start.wrapping_add(100));
    assert_eq!(ctl.pwm().lit(), vec![1]);

    ctl.tick(start.wrapping_add(200));
    assert_eq!(ctl.pwm().lit(), vec![2]);
}

// ============================================================================
// Tests: Blinken
// ============================================================================

#[test]
fn test_blink_toggles_every_interval() {
    let mut ctl = controller();
    switch_on(&mut ctl, 13, 50, 0);
    ctl.apply(
        Command::SetInterval {
            channel: 13,
            interval_ms: 200,
        },
        0,
    )
    .unwrap();

    let i = index(13);
    assert_eq!(ctl.pwm().levels[i], 128);

    let mut expected = 128;
    for step in 1..=6 {
        let now = step * 200;
        ctl.tick(now - 1);
        assert_eq!(ctl.pwm().levels[i], expected, "t={}", now - 1);

        ctl.tick(now);
        expected = if expected == 0 { 128 } else { 0 };
        assert_eq!(ctl.pwm().levels[i], expected, "t={now}");
    }
}

#[test]
fn test_blink_across_timer_wraparound() {
    let start = u32::MAX - 100;
    let mut ctl = controller();
    switch_on(&mut ctl, 4, 100, start);
    ctl.apply(
        Command::SetInterval {
            channel: 4,
            interval_ms: 200,
        },
        start,
    )
    .unwrap();

    ctl.tick(start.wrapping_add(150));
    assert_eq!(ctl.pwm().levels[0], 255);
    ctl.tick(start.wrapping_add(200));
    assert_eq!(ctl.pwm().levels[0], 0);
}

#[test]
fn test_solid_output_is_not_rewritten() {
    let mut ctl = controller();
    switch_on(&mut ctl, 14, 100, 0);
    let writes = ctl.pwm().write_count();

    for now in 1..500 {
        ctl.tick(now);
    }
    assert_eq!(ctl.pwm().write_count(), writes);
}

#[test]
fn test_inactive_output_is_not_rewritten() {
    let mut ctl = controller();
    let writes = ctl.pwm().write_count();

    for now in (0..2000).step_by(10) {
        ctl.tick(now);
    }
    assert_eq!(ctl.pwm().write_count(), writes);
    assert!(ctl.pwm().lit().is_empty());
}

#[test]
fn test_group_has_priority_over_blinking() {
    let mut ctl = controller();
    switch_on(&mut ctl, 4, 100, 0);
    ctl.apply(
        Command::SetInterval {
            channel: 4,
            interval_ms: 30,
        },
        0,
    )
    .unwrap();
    chase(&mut ctl, &[4, 5], 100, 0);

    // Blink-Intervall 30ms würde GPIO 4 vor dem ersten Schritt ausschalten
    for now in (0..100).step_by(5) {
        ctl.tick(now);
        assert_eq!(ctl.pwm().lit(), vec![index(4)], "t={now}");
    }
    ctl.tick(100);
    assert_eq!(ctl.pwm().lit(), vec![index(5)]);
}

#[test]
fn test_deleted_group_member_resumes_blinking_when_switched_on() {
    let mut ctl = controller();
    ctl.apply(
        Command::SetInterval {
            channel: 4,
            interval_ms: 100,
        },
        0,
    )
    .unwrap();
    chase(&mut ctl, &[4, 5], 100, 0);
    ctl.apply(Command::DeleteGroup { group_id: 1 }, 50).unwrap();
    assert!(ctl.pwm().lit().is_empty());

    switch_on(&mut ctl, 4, 100, 60);
    assert_eq!(ctl.pwm().levels[0], 255);
    ctl.tick(160);
    assert_eq!(ctl.pwm().levels[0], 0);
}
