use rand::Rng;
use serde::Serialize;

/// Device node as stored under `/{path}/{device_id}` in the Realtime Database.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceNode {
    #[serde(rename = "fcmToken", skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
    pub sensors: Sensors,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sensors {
    /// Unix epoch seconds.
    pub timestamp: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub battery: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Reports on every round.
    Healthy,
    /// Reports once, then goes quiet.
    Silent,
    /// Reports on every round but never registers a push token.
    Tokenless,
}

pub fn assign_role(rng: &mut impl Rng, silent_ratio: f64, tokenless_ratio: f64) -> Role {
    let roll: f64 = rng.gen();
    if roll < silent_ratio {
        Role::Silent
    } else if roll < silent_ratio + tokenless_ratio {
        Role::Tokenless
    } else {
        Role::Healthy
    }
}

pub fn generate_reading(rng: &mut impl Rng, fcm_token: Option<String>, now: i64) -> DeviceNode {
    let temperature = if rng.gen_bool(0.05) {
        rng.gen_range(-50.0..100.0) // 5% outliers
    } else {
        rng.gen_range(15.0..35.0)
    };

    let humidity = rng.gen_range(30.0..80.0);

    let battery = if rng.gen_bool(0.02) {
        rng.gen_range(0.0..20.0) // 2% low battery
    } else {
        rng.gen_range(20.0..100.0)
    };

    DeviceNode {
        fcm_token,
        sensors: Sensors {
            timestamp: now,
            temperature,
            humidity,
            battery,
        },
    }
}
