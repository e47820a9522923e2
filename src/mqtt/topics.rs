/// Topic layout below the configured instance name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Topics {
            prefix: prefix.into(),
        }
    }

    pub fn bridge_online(&self) -> String {
        format!("{}/maintenance/_bridge/online", self.prefix)
    }

    pub fn set_wildcard(&self) -> String {
        format!("{}/set/+", self.prefix)
    }

    pub fn status(&self, id: &str) -> String {
        format!("{}/status/{}", self.prefix, id)
    }

    pub fn device_online(&self, id: &str) -> String {
        format!("{}/maintenance/{}/online", self.prefix, id)
    }

    /// Extracts the device id from a `<prefix>/set/<id>` topic.
    pub fn parse_set(&self, topic: &str) -> Option<String> {
        let id = topic
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix("/set/")?;

        if id.is_empty() || id.contains('/') {
            return None;
        }

        Some(id.to_string())
    }
}
