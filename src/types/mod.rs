// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Phantom-typed remote IDs, image names, and lifecycle states.

mod id;
mod image_name;
mod state;

pub use id::{EmptyIdError, Id, ImageId, JobId, ServiceInstanceId};
pub use image_name::{ImageName, ImageNameError, MAX_IMAGE_NAME_LEN};
pub use state::{ImageState, JobState};
