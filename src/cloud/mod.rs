// ABOUTME: Cloud image service access: capability trait, HTTP backend, client factory.
// ABOUTME: The import controller only ever sees the CloudImageClient trait.

mod client;
mod factory;
mod http;
mod region;

pub use client::{
    BucketAccess, CloudError, CloudImageClient, IMPORT_BUCKET_ACCESS, ImportJob, ImportJobRequest,
    JobRef, RemoteImage,
};
pub use factory::{
    ClientFactory, CloudSettings, DEFAULT_IAM_ENDPOINT, DEFAULT_RESOURCE_CONTROLLER_ENDPOINT,
    HttpClientFactory, instance_crn,
};
pub use http::HttpCloudClient;
pub use region::{endpoint_for_region, region_for_zone};
