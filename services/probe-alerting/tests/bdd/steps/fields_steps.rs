//! BDD step definitions for alert field building

use chrono::{DateTime, TimeZone, Utc};
use cucumber::{given, then, when};

use probe_alerting::fields::alert_fields;
use probe_alerting::{AlertInfo, Endpoint, Fields};

use crate::world::AlertingWorld;

pub fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap_or_else(|e| panic!("Invalid timestamp '{}': {}", s, e))
        .with_timezone(&Utc)
}

#[given(expr = "an alert {string} for probe {string} on target {string}")]
fn alert_on_target(world: &mut AlertingWorld, name: String, probe: String, target: String) {
    world.alert = Some(AlertInfo {
        name,
        probe_name: probe,
        condition_id: String::new(),
        target: Endpoint::new(target),
        failures: 0,
        total: 0,
        failing_since: Utc.timestamp_opt(0, 0).unwrap(),
    });
}

#[given(expr = "the target has label {string} set to {string}")]
fn target_label(world: &mut AlertingWorld, key: String, value: String) {
    world.alert_mut().target.labels.insert(key, value);
}

#[given(expr = "the target port is {int}")]
fn target_port(world: &mut AlertingWorld, port: u16) {
    world.alert_mut().target.port = port;
}

#[given(expr = "the alert has {int} failures out of {int} failing since {string}")]
fn alert_counts(world: &mut AlertingWorld, failures: u32, total: u32, since: String) {
    let alert = world.alert_mut();
    alert.failures = failures;
    alert.total = total;
    alert.failing_since = parse_time(&since);
    alert.condition_id = alert.failing_since.timestamp().to_string();
}

#[when("the alert fields are built")]
fn build_fields(world: &mut AlertingWorld) {
    let alert = world.alert.as_ref().expect("alert not set");
    world.fields = Some(alert_fields(alert).expect("alert fields"));
}

#[then(expr = "the field {string} should be {string}")]
fn field_should_be(world: &mut AlertingWorld, key: String, expected: String) {
    let fields = world.fields.as_ref().expect("fields not built");
    assert_eq!(
        fields.get(&key),
        Some(&expected),
        "unexpected value for field '{}'",
        key
    );
}

#[then(expr = "there should be {int} fields")]
fn field_count(world: &mut AlertingWorld, expected: usize) {
    let fields = world.fields.as_ref().expect("fields not built");
    assert_eq!(fields.len(), expected, "fields: {:?}", fields.keys());
}

#[then("the json field should decode to the other fields")]
fn json_round_trips(world: &mut AlertingWorld) {
    let fields = world.fields.as_ref().expect("fields not built");
    let decoded: Fields = serde_json::from_str(&fields["json"]).expect("valid json");

    let mut expected = fields.clone();
    expected.remove("json");
    assert_eq!(decoded, expected);
}
