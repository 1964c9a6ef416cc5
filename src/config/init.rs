// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates the cosimport.yml template and an example image manifest.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, DEFAULT_STATE_DIR};

pub const MANIFEST_EXAMPLE_FILENAME: &str = "image.example.yml";

/// Write `cosimport.yml` and an example manifest into `dir`.
pub fn init_config(dir: &Path, zone: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    if let Some(z) = zone
        && crate::cloud::region_for_zone(z).is_none()
    {
        return Err(Error::InvalidConfig(format!("unknown zone: {z}")));
    }

    std::fs::write(&config_path, generate_template_yaml(zone))?;

    let manifest_path = dir.join(MANIFEST_EXAMPLE_FILENAME);
    if !manifest_path.exists() || force {
        std::fs::write(&manifest_path, MANIFEST_TEMPLATE)?;
    }

    Ok(())
}

fn generate_template_yaml(zone: Option<&str>) -> String {
    let zone_line = match zone {
        Some(z) => format!("  zone: {z}"),
        None => "  # zone: dal12  # looked up from the workspace when unset".to_string(),
    };
    format!(
        r#"state_dir: {DEFAULT_STATE_DIR}
cloud:
  api_key:
    env: IBMCLOUD_API_KEY
  account:
    env: IBMCLOUD_ACCOUNT_ID
{zone_line}
reconcile:
  requeue_after: 30s
  retry_failed_imports: true
"#
    )
}

const MANIFEST_TEMPLATE: &str = r#"name: boot-img
spec:
  service_instance_id: 00000000-0000-0000-0000-000000000000
  bucket: my-images
  object: rhcos.ova.gz
  region: us-south
  storage_type: tier1
"#;
