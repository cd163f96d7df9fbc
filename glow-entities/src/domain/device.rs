/// Host-platform device record that groups every entity of one IHD.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceInfo {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    /// `(kind, id)` pairs, e.g. `("mac", "1234567890AB")`.
    pub connections: Vec<(String, String)>,
}

impl DeviceInfo {
    pub fn glow_ihd(device_id: &str) -> Self {
        Self {
            name: format!("Glow Smart Meter {device_id}"),
            manufacturer: "Hildebrand Technology Limited".to_string(),
            model: "Glow Smart Meter IHD".to_string(),
            connections: vec![("mac".to_string(), device_id.to_string())],
        }
    }
}
