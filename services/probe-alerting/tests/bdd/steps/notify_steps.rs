//! BDD step definitions for notification commands

use std::sync::Arc;

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use probe_alerting::fields::alert_fields;
use probe_alerting::io::CommandLauncher;
use probe_alerting::notifier::{Condition, Notifier};
use probe_alerting::state::TargetState;

use crate::world::AlertingWorld;

fn build_notifier(world: &AlertingWorld) -> Notifier {
    let alert = world.alert.as_ref().expect("alert not set");
    let launcher: Arc<dyn CommandLauncher> = world.launcher.clone();
    let mut notifier = Notifier::new(
        alert.name.clone(),
        alert.probe_name.clone(),
        Condition {
            failures: alert.failures,
            total: alert.total,
        },
        launcher,
        CancellationToken::new(),
    );
    if let Some(command) = &world.command {
        notifier = notifier.with_command(command.clone());
    }
    notifier
}

#[given(expr = "a notification command {string}")]
fn notification_command(world: &mut AlertingWorld, command: String) {
    world.command = Some(command);
}

#[when(expr = "the command {string} is previewed")]
fn preview_command(world: &mut AlertingWorld, command: String) {
    let notifier = build_notifier(world);
    let alert = world.alert.as_ref().expect("alert not set");
    let fields = alert_fields(alert).expect("alert fields");
    world.preview = notifier.notify_command(&CancellationToken::new(), &command, &fields, true);
}

#[when("the alert is notified")]
fn alert_notified(world: &mut AlertingWorld) {
    let notifier = build_notifier(world);
    let alert = world.alert.as_ref().expect("alert not set");

    let mut state = world.target_state.take().unwrap_or_default();
    state.failing_since = Some(alert.failing_since);
    state.condition_id = alert.condition_id.clone();

    notifier.notify(&alert.target, &mut state, alert.failures);
    world.target_state = Some(state);
}

#[then(expr = "the command line should be {string}")]
fn command_line_should_be(world: &mut AlertingWorld, expected: String) {
    let argv = world.preview.as_ref().expect("no command line was resolved");
    assert_eq!(argv.join(" "), expected);
}

#[then(expr = "the command should have {int} arguments")]
fn command_argument_count(world: &mut AlertingWorld, expected: usize) {
    let argv = world.preview.as_ref().expect("no command line was resolved");
    assert_eq!(argv.len(), expected, "argv: {:?}", argv);
}

#[then("no command line should be resolved")]
fn no_command_line(world: &mut AlertingWorld) {
    assert!(
        world.preview.is_none(),
        "expected no command line, got {:?}",
        world.preview
    );
}

#[then("the target should be marked as alerted")]
fn target_alerted(world: &mut AlertingWorld) {
    let state: &TargetState = world.target_state.as_ref().expect("not notified");
    assert!(state.alerted);
}

#[then("no command should be started")]
fn no_command_started(world: &mut AlertingWorld) {
    let started = world.launcher.started.lock().unwrap();
    assert!(started.is_empty(), "unexpected commands: {:?}", started);
}

#[then(expr = "{int} command(s) should have been started")]
fn commands_started(world: &mut AlertingWorld, expected: usize) {
    let started = world.launcher.started.lock().unwrap();
    assert_eq!(started.len(), expected, "commands: {:?}", started);
}

#[then(expr = "the started command should be {string}")]
fn started_command_should_be(world: &mut AlertingWorld, expected: String) {
    let started = world.launcher.started.lock().unwrap();
    let last = started.last().expect("no command started");
    assert_eq!(last.join(" "), expected);
}
