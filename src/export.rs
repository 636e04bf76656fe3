//! Companion outputs derived from a decoded volume: a bare sample dump and
//! an XDMF descriptor that lets viewers locate a dataset in an HDF5 file.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{Error, SampleType, Volume, open_file};

/// `<source without its last extension>_<dtype>_(<d0>, <d1>, <d2>).raw`
pub fn raw_dump_path(
    source: impl AsRef<Path>,
    sample_type: SampleType,
    shape: [usize; 3],
) -> PathBuf {
    let mut name: OsString = source.as_ref().with_extension("").into_os_string();
    name.push(format!(
        "_{}_({}, {}, {}).raw",
        sample_type.name(),
        shape[0],
        shape[1],
        shape[2]
    ));
    PathBuf::from(name)
}

/// Writes the samples of `volume` to `path` with no header.
pub fn write_raw(path: impl AsRef<Path>, volume: &Volume) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    volume.write_samples_le(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Decodes the MRC file at `source` and dumps its samples next to it.
/// Returns the path of the dump.
pub fn mrc_to_raw(source: impl AsRef<Path>) -> Result<PathBuf, Error> {
    let source = source.as_ref();
    let (metadata, volume) = open_file(source)?;
    let out = raw_dump_path(source, metadata.sample_type(), metadata.shape());
    write_raw(&out, &volume)?;
    tracing::debug!(source = %source.display(), out = %out.display(), "wrote raw dump");
    Ok(out)
}

/// XDMF 2.2 descriptor for one uniform 3D dataset stored in an HDF5 file.
#[derive(Debug, Clone, PartialEq)]
pub struct XdmfDescriptor {
    /// HDF5 file the descriptor points at, as written in the `DataItem`.
    pub data_file: String,
    /// Full path of the dataset inside the HDF5 file.
    pub dataset: String,
    pub shape: [usize; 3],
    pub sample_type: SampleType,
    /// Spacing between samples along each axis.
    pub spacing: [f32; 3],
}

impl XdmfDescriptor {
    pub fn new(
        data_file: impl Into<String>,
        dataset: impl Into<String>,
        shape: [usize; 3],
        sample_type: SampleType,
        spacing: [f32; 3],
    ) -> Self {
        Self {
            data_file: data_file.into(),
            dataset: dataset.into(),
            shape,
            sample_type,
            spacing,
        }
    }

    fn number_type(&self) -> (&'static str, usize) {
        match self.sample_type {
            SampleType::Int8 => ("Char", 1),
            SampleType::Int16 => ("Short", 2),
            SampleType::Uint16 => ("UShort", 2),
            SampleType::Float32 => ("Float", 4),
        }
    }

    pub fn render(&self) -> String {
        let [d0, d1, d2] = self.shape;
        let [s0, s1, s2] = self.spacing;
        let (number_type, precision) = self.number_type();
        let grid = escape(&self.data_file);
        let dataset = escape(&self.dataset);

        format!(
            concat!(
                "<?xml version=\"1.0\" ?>\n",
                "<!DOCTYPE Xdmf SYSTEM \"Xdmf.dtd\" []>\n",
                "<Xdmf xmlns:xi=\"http://www.w3.org/2003/XInclude\" Version=\"2.2\">\n",
                "<Domain>\n",
                "<Grid Name=\"{grid}\" GridType=\"Uniform\">\n",
                "<Topology TopologyType=\"3DCORECTMesh\" Dimensions=\"{d0} {d1} {d2}\"/>\n",
                "<Geometry GeometryType=\"ORIGIN_DXDYDZ\">\n",
                "<DataItem Name=\"Origin\" Dimensions=\"3\" ",
                "NumberType=\"Float\" Precision=\"4\" Format=\"XML\">0 0 0</DataItem>\n",
                "<DataItem Name=\"Spacing\" Dimensions=\"3\" ",
                "NumberType=\"Float\" Precision=\"4\" Format=\"XML\">{s0} {s1} {s2}</DataItem>\n",
                "</Geometry>\n",
                "<Attribute Name=\"{dataset}\" AttributeType=\"Scalar\" Center=\"Node\">\n",
                "<DataItem Format=\"HDF\" NumberType=\"{number_type}\" ",
                "Precision=\"{precision}\" Dimensions=\"{d0} {d1} {d2}\">",
                "{grid}:{dataset}</DataItem>\n",
                "</Attribute>\n",
                "</Grid>\n",
                "</Domain>\n",
                "</Xdmf>\n",
            ),
            grid = grid,
            dataset = dataset,
            d0 = d0,
            d1 = d1,
            d2 = d2,
            s0 = s0,
            s1 = s1,
            s2 = s2,
            number_type = number_type,
            precision = precision,
        )
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(self.render().as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_dump_path_replaces_last_extension() {
        let path = raw_dump_path("/data/tomo.v2.mrc", SampleType::Int16, [6, 5, 4]);
        assert_eq!(path, PathBuf::from("/data/tomo.v2_int16_(6, 5, 4).raw"));
    }

    #[test]
    fn test_raw_dump_path_without_extension() {
        let path = raw_dump_path("stack", SampleType::Float32, [1, 2, 3]);
        assert_eq!(path, PathBuf::from("stack_float32_(1, 2, 3).raw"));
    }

    #[test]
    fn test_xdmf_render() {
        let xmf = XdmfDescriptor::new(
            "tomo.emd",
            "/data/stack/data",
            [6, 5, 4],
            SampleType::Uint16,
            [1.0, 2.5, 2.5],
        )
        .render();
        assert!(xmf.starts_with("<?xml version=\"1.0\" ?>\n"));
        assert!(xmf.contains("TopologyType=\"3DCORECTMesh\" Dimensions=\"6 5 4\""));
        assert!(xmf.contains("Format=\"XML\">1 2.5 2.5</DataItem>"));
        assert!(xmf.contains("NumberType=\"UShort\" Precision=\"2\""));
        assert!(xmf.contains(">tomo.emd:/data/stack/data</DataItem>"));
        assert!(xmf.ends_with("</Xdmf>\n"));
    }

    #[test]
    fn test_xdmf_escapes_attribute_values() {
        let xmf =
            XdmfDescriptor::new("a&b.h5", "/x\"y", [1, 1, 1], SampleType::Int8, [1.0; 3]).render();
        assert!(xmf.contains("Grid Name=\"a&amp;b.h5\""));
        assert!(xmf.contains("Attribute Name=\"/x&quot;y\""));
        assert!(xmf.contains("NumberType=\"Char\" Precision=\"1\""));
    }
}
