use mrc_volume::MrcFile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: mrc_info <file.mrc>...");
        std::process::exit(2);
    }

    for path in paths {
        println!("=== {path} ===");
        let file = match MrcFile::open(&path) {
            Ok(file) => file,
            Err(e) => {
                println!("failed to open: {e}");
                continue;
            }
        };

        let meta = file.metadata();
        let [d0, d1, d2] = meta.shape();
        println!("Shape: {d0}x{d1}x{d2} ({})", meta.sample_type());
        let [v0, v1, v2] = meta.voxel_size();
        println!("Voxel size: {v0:.3} x {v1:.3} x {v2:.3} Å");
        println!("Axis orientations: {:?}", meta.axis_orientations());
        println!("Cell angles: {:?}", meta.cell_angles());
        println!("Data offset: {} bytes", meta.data_offset());
        if let Some(ext) = meta.vendor_extension() {
            println!(
                "FEI block: tilt {:.2}°, pixel {:.3e} m, {:.0} V, mag {:.0}",
                ext.a_tilt, ext.pixel_size, ext.voltage, ext.magnification
            );
        }

        match file.read_volume() {
            Ok(volume) => {
                let stats = volume.stats();
                println!(
                    "Data range: {:.3} to {:.3} (mean: {:.3})",
                    stats.min, stats.max, stats.mean
                );
            }
            Err(e) => println!("failed to read samples: {e}"),
        }
    }

    Ok(())
}
