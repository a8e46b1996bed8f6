use std::path::PathBuf;

use dicom_seg_volume::seg_loader::SegVolumeLoader;

fn main() {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .expect("usage: dicom-seg-volume <seg.dcm>");
    let volume = SegVolumeLoader::load_from_file(PathBuf::from(path))
        .expect("should have decoded the SEG file");

    let (slices, rows, columns) = volume.dim();
    println!(
        "{columns}x{rows}x{slices} volume, {} channel(s), series {}",
        volume.channels, volume.metadata.series_instance_uid
    );
    for segment in &volume.metadata.segments {
        println!(
            "  segment {:>3}  {:<24} {:?}",
            segment.number, segment.label, segment.display_value
        );
    }
}
