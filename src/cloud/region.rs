// ABOUTME: Zone to region resolution for Power Virtual Server workspaces.
// ABOUTME: The API endpoint is per region, while instances report their zone.

/// Zone prefixes and the region that serves them. First match wins.
const ZONE_PREFIXES: &[(&str, &str)] = &[
    ("us-south", "us-south"),
    ("us-east", "us-east"),
    ("dal", "dal"),
    ("wdc", "wdc"),
    ("sao", "sao"),
    ("tor", "tor"),
    ("mon", "mon"),
    ("eu-de-", "eu-de"),
    ("lon", "lon"),
    ("osa", "osa"),
    ("syd", "syd"),
    ("tok", "tok"),
];

/// Map a zone such as `dal12` or `eu-de-1` to its API region.
pub fn region_for_zone(zone: &str) -> Option<&'static str> {
    let zone = zone.trim();
    ZONE_PREFIXES
        .iter()
        .find(|(prefix, _)| zone.starts_with(prefix))
        .map(|(_, region)| *region)
}

/// Default API endpoint for a region.
pub fn endpoint_for_region(region: &str) -> String {
    format!("https://{}.power-iaas.cloud.ibm.com", region)
}
