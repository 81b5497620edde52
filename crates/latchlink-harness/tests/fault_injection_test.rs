//! Fault injection against the running driver loop.
//!
//! Every failure class from the protocol's error taxonomy: corrupt
//! frames, misaddressed and misechoed responses, board status errors,
//! write failures, open failures, dead links, and silent boards. None of
//! them may surface as anything worse than a `LinkError` notification -
//! the supervisor recovers on its own in every case.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use latchlink_core::LinkConfig;
use latchlink_driver::{LinkCommand, LinkDriver, LinkHandle, LinkNotification};
use latchlink_harness::{
    SimHandle, SimTransport, corrupted, response, status_response, unlock_response,
};
use latchlink_proto::{Command, LockStatus};
use tokio::time::timeout;

fn start() -> (SimHandle, LinkHandle, tokio::task::JoinHandle<()>) {
    let (transport, sim) = SimTransport::new();
    let (driver, handle) = LinkDriver::new(LinkConfig::default(), transport);
    let task = tokio::spawn(driver.run());
    (sim, handle, task)
}

async fn next_notification(handle: &mut LinkHandle) -> LinkNotification {
    timeout(Duration::from_secs(600), handle.notified()).await.unwrap().unwrap()
}

/// Script a clean finish: the next two writes complete the cycle.
fn finish_cycle(sim: &SimHandle) {
    sim.reply_with(unlock_response(0x01, 0x01, LockStatus::Unlocked));
    sim.reply_with(status_response(0x01, 0x01, LockStatus::Locked));
}

#[tokio::test(start_paused = true)]
async fn corrupt_checksum_resends_current_command() {
    let (sim, mut handle, task) = start();

    sim.reply_with(corrupted(unlock_response(0x01, 0x01, LockStatus::Locked)));
    finish_cycle(&sim);

    handle.command(LinkCommand::Unlock).await;
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    // The rejected reply triggered a resend of the unchanged unlock frame
    // on the existing connection.
    let written = sim.written();
    assert_eq!(written[0], written[1]);
    assert_eq!(written[0][6], Command::Unlock.to_byte());
    assert_eq!(sim.opens(), 1);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn misaddressed_response_soft_retries() {
    let (sim, mut handle, task) = start();

    // Right shape, wrong board.
    sim.reply_with(unlock_response(0x07, 0x01, LockStatus::Locked));
    finish_cycle(&sim);

    handle.command(LinkCommand::Unlock).await;
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    let written = sim.written();
    assert_eq!(written[0], written[1]);
    assert_eq!(sim.opens(), 1);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn wrong_command_echo_soft_retries() {
    let (sim, mut handle, task) = start();

    // Status echo while an unlock is in flight.
    sim.reply_with(status_response(0x01, 0x01, LockStatus::Locked));
    finish_cycle(&sim);

    handle.command(LinkCommand::Unlock).await;
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    let written = sim.written();
    assert_eq!(written[0], written[1]);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn board_error_status_soft_retries() {
    let (sim, mut handle, task) = start();

    sim.reply_with(response(0x01, 0x01, Command::Unlock, 0x1F, 0x00));
    finish_cycle(&sim);

    handle.command(LinkCommand::Unlock).await;
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    assert_eq!(sim.written()[0], sim.written()[1]);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unknown_lock_status_soft_retries() {
    let (sim, mut handle, task) = start();

    sim.reply_with(response(0x01, 0x01, Command::Unlock, 0x00, 0x7E));
    finish_cycle(&sim);

    handle.command(LinkCommand::Unlock).await;
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    assert_eq!(sim.written()[0], sim.written()[1]);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn write_failure_reopens_and_replays() {
    let (sim, mut handle, task) = start();

    // First unlock write fails at the transport; the reopened port gets
    // the replayed unlock.
    sim.fail_next_writes(1);
    finish_cycle(&sim);

    handle.command(LinkCommand::Unlock).await;

    assert_eq!(next_notification(&mut handle).await, LinkNotification::LinkError);
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    let written = sim.written();
    // Failed attempt, replayed unlock, closing status poll.
    assert_eq!(written.len(), 3);
    assert_eq!(written[0], written[1]);
    assert_eq!(sim.opens(), 2);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_reopen_backs_off_and_retries() {
    let (sim, mut handle, task) = start();

    // Write failure, then the reopen itself fails once: the supervisor
    // waits out the backoff before trying again.
    sim.fail_next_writes(1);
    sim.fail_next_opens(1);
    finish_cycle(&sim);

    let started = tokio::time::Instant::now();
    handle.command(LinkCommand::Unlock).await;

    assert_eq!(next_notification(&mut handle).await, LinkNotification::LinkError);
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    assert!(started.elapsed() >= Duration::from_millis(10_000));
    // Initial open, failed reopen, successful reopen.
    assert_eq!(sim.opens(), 3);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn open_failures_retry_indefinitely() {
    let (sim, mut handle, task) = start();

    sim.fail_next_opens(5);
    finish_cycle(&sim);

    let started = tokio::time::Instant::now();
    handle.command(LinkCommand::Unlock).await;
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    // Five failed opens, each followed by the fixed backoff.
    assert!(started.elapsed() >= Duration::from_millis(50_000));
    assert_eq!(sim.opens(), 6);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dead_link_triggers_reconnect() {
    let (sim, mut handle, task) = start();

    // The board answers the unlock, then the line dies before the
    // confirmation poll is answered.
    sim.reply_with(unlock_response(0x01, 0x01, LockStatus::Locked));
    sim.reply_silence();
    // After the reconnect the pending status command is replayed.
    sim.reply_with(status_response(0x01, 0x01, LockStatus::Unlocked));
    sim.reply_with(status_response(0x01, 0x01, LockStatus::Unlocked));
    sim.reply_with(status_response(0x01, 0x01, LockStatus::Locked));

    handle.command(LinkCommand::Unlock).await;

    // Let the confirmation poll go out before the line dies.
    while sim.written().len() < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sim.break_link();

    assert_eq!(next_notification(&mut handle).await, LinkNotification::LinkError);
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);
    assert_eq!(sim.opens(), 2);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn silent_board_times_out_and_replays() {
    let (sim, mut handle, task) = start();

    // No reply to the first unlock; the response timeout reconnects and
    // replays it.
    sim.reply_silence();
    finish_cycle(&sim);

    let started = tokio::time::Instant::now();
    handle.command(LinkCommand::Unlock).await;

    assert_eq!(next_notification(&mut handle).await, LinkNotification::LinkError);
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    // The default response timeout elapsed before the replay.
    assert!(started.elapsed() >= Duration::from_millis(5_000));
    let written = sim.written();
    assert_eq!(written[0], written[1]);
    assert_eq!(sim.opens(), 2);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn repeated_garbage_does_not_wedge_the_link() {
    let (sim, mut handle, task) = start();

    // Three rejectable replies in a row, then a clean finish.
    sim.reply_with(corrupted(unlock_response(0x01, 0x01, LockStatus::Locked)));
    sim.reply_with(unlock_response(0x01, 0x02, LockStatus::Locked));
    sim.reply_with(status_response(0x01, 0x01, LockStatus::Locked));
    finish_cycle(&sim);

    handle.command(LinkCommand::Unlock).await;
    assert_eq!(next_notification(&mut handle).await, LinkNotification::Locked);

    let written = sim.written();
    assert_eq!(written.len(), 5);
    // Every retry resent the identical unlock frame.
    assert_eq!(written[0], written[1]);
    assert_eq!(written[1], written[2]);
    assert_eq!(written[2], written[3]);
    assert_eq!(sim.opens(), 1);

    handle.command(LinkCommand::Shutdown).await;
    task.await.unwrap();
}
