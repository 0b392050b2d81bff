//! Integration tests for the text replay format.

use relay::{message_to_json, Header, Message, Record, ReplayRegistry, Replayed};
use serde_json::json;

relay::message! {
    /// One joint of an arm.
    pub struct JointState {
        pub name: String,
        pub position: f64,
        pub velocity: f32,
        pub effort: i32,
        pub index: u8,
    }
}

fn joint(name: &str, position: f64, velocity: f32, effort: i32, index: u8) -> JointState {
    JointState {
        header: Header::with(17, 1712.25),
        name: name.to_string(),
        position,
        velocity,
        effort,
        index,
    }
}

#[test]
fn test_rendered_line_is_bit_exact() {
    let line = joint("elbow", 1.5, -0.25, -3, 2).render();
    assert_eq!(
        line,
        "JointState(n=17, t=1712.25, effort=-3, index=2, name='elbow', position=1.5, velocity=-0.25)"
    );
}

#[test]
fn test_round_trip_holds_for_representative_values() {
    let cases = [
        joint("", 0.0, 0.0, 0, 0),
        joint("left wrist", -12.125, -0.5, -42, 255),
        joint("base joint 0", 0.1, 3.75, i32::MAX, 7),
        joint("tip", 1e-9, f32::MIN_POSITIVE, i32::MIN, 1),
    ];
    for original in cases {
        let parsed = JointState::parse(&original.render())
            .unwrap()
            .unwrap_or_else(|| panic!("no match for {}", original.render()));
        assert_eq!(parsed, original);
        assert_eq!(parsed.header.seq, original.header.seq);
        assert_eq!(parsed.header.stamp, original.header.stamp);
    }
}

#[test]
fn test_registry_dispatches_a_mixed_recording() {
    relay::message! {
        pub struct Battery {
            pub volts: f64,
        }
    }

    let registry = ReplayRegistry::new().with::<JointState>().with::<Battery>();
    let battery = Battery {
        header: Header::with(3, 2.0),
        volts: 11.75,
    };
    let recording = [
        joint("knee", 0.5, 0.0, 1, 1).render(),
        "# recorder started".to_string(),
        battery.render(),
    ];

    let mut kinds = Vec::new();
    for line in &recording {
        match registry.parse_line(line).unwrap() {
            Replayed::Message(message) => kinds.push(message.type_name().to_string()),
            Replayed::Opaque(_) => kinds.push("opaque".to_string()),
        }
    }
    assert_eq!(kinds, vec!["JointState", "opaque", "Battery"]);
}

#[test]
fn test_json_view_lists_header_and_fields() {
    let value = message_to_json(&joint("hip", 0.75, 0.5, 10, 3));
    assert_eq!(
        value,
        json!({
            "type": "JointState",
            "n": 17,
            "t": 1712.25,
            "effort": 10,
            "index": 3,
            "name": "hip",
            "position": 0.75,
            "velocity": 0.5,
        })
    );
}
