//! # DICOM-SEG-volume library
//!
//! This crate decodes DICOM Segmentation (SEG) objects into spatially
//! consistent, gap-free 3D labeled volumes.

//!
//! This library is part of the dicom-rs ecosystem and leverages its
//! components to turn a SEG element tree plus its multi-frame pixel buffer
//! into a single voxel volume. Per-frame 3D positions are recovered from
//! the functional-group sequences, deduplicated and sorted, slices without
//! segmented content are synthesized from the through-plane spacing, and
//! each frame's labeled pixels are scattered into the correct slice using
//! its segment's display value (grayscale, or sRGB converted from the
//! recommended CIELab value). SEG objects are assumed to have the
//! following attributes:
//!  - Uncompressed transfer syntax
//!  - BINARY segmentation type
//!  - A single dimension organization, 3D if typed
//!  - One orientation and one spacing shared by all frames
//!
//!  Contributions are highly welcome!
//!
//! # Examples
//!
//! ## Decoding a SEG file into a labeled volume
//!
//! Read a SEG object from disk, unpack its bit-packed binary frames, and
//! inspect the resulting volume and its segments.
//!
//! ```no_run
//! # use dicom_seg_volume::SegVolumeLoader;
//! let volume = SegVolumeLoader::load_from_file("liver.dcm")
//!     .expect("should have decoded the SEG file");
//! let (slices, rows, columns) = volume.dim();
//! println!("{columns}x{rows}x{slices} labeled volume");
//! for segment in &volume.metadata.segments {
//!     println!("segment {}: {}", segment.number, segment.label);
//! }
//! ```

pub mod dimension;
pub mod frame;
pub mod position;
pub mod seg_loader;
pub mod segment;
pub mod slices;
mod validate;
pub mod volume;

pub use seg_loader::{SegVolumeError, SegVolumeLoader};
pub use volume::{PhotometricInterpretation, SegMetadata, SegVolume, SegVolumeGeometry};
