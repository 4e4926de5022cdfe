use std::path::PathBuf;

use floorwatch_core::types::Zone;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// The persisted configuration document: the camera stream locator plus the
/// monitored zone list. The drawing UI replaces the zone list; the stream
/// URL is deployment-owned and edited out of band.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneConfig {
    #[serde(default)]
    pub stream_url: String,
    #[serde(default)]
    pub zones: Vec<Zone>,
}

#[derive(Debug, thiserror::Error)]
pub enum ZoneConfigError {
    #[error("failed to access zone config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("zone config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// JSON-file zone configuration store. Reads are plain file reads; writes
/// are whole-document read-modify-write sequences serialized by a lock so
/// concurrent writers cannot interleave.
pub struct ZoneConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ZoneConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn read(&self) -> Result<ZoneConfig, ZoneConfigError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Replace the zone list, preserving the rest of the document. Returns
    /// the number of zones stored.
    pub async fn replace_zones(&self, zones: Vec<Zone>) -> Result<usize, ZoneConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.read().await?;
        config.zones = zones;
        let raw = serde_json::to_string_pretty(&config)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(config.zones.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floorwatch_core::types::Region;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let path = std::env::temp_dir().join(format!("floorwatch-{name}-{millis}.json"));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn reads_the_configured_document() {
        let path = temp_config(
            "read",
            r#"{"stream_url": "rtsp://cam", "zones": [{"id": 1, "name": "Chair 1"}]}"#,
        );
        let store = ZoneConfigStore::new(path);
        let config = store.read().await.unwrap();
        assert_eq!(config.stream_url, "rtsp://cam");
        assert_eq!(config.zones.len(), 1);
        assert!(config.zones[0].region.is_none());
    }

    #[tokio::test]
    async fn replace_zones_preserves_the_stream_url() {
        let path = temp_config("replace", r#"{"stream_url": "rtsp://cam", "zones": []}"#);
        let store = ZoneConfigStore::new(path);
        let saved = store
            .replace_zones(vec![Zone {
                id: 2,
                name: "Chair 2".into(),
                region: Some(Region {
                    x: 1.0,
                    y: 2.0,
                    width: 3.0,
                    height: 4.0,
                }),
            }])
            .await
            .unwrap();
        assert_eq!(saved, 1);

        let config = store.read().await.unwrap();
        assert_eq!(config.stream_url, "rtsp://cam");
        assert_eq!(config.zones[0].id, 2);
        assert!(config.zones[0].region.is_some());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let store = ZoneConfigStore::new("/nonexistent/floorwatch/config.json");
        assert!(store.read().await.is_err());
    }
}
