use std::fs::File;
use std::io::BufWriter;
#[cfg(feature = "mmap")]
use std::io::Cursor;
use std::path::Path;

use ndarray::{ArrayBase, Data, Dimension};

use crate::{Error, Sample, Volume, VolumeMetadata, WriteOptions, prepare_write, read_volume};

/// An open MRC file with its decoded header.
///
/// The file handle lives exactly as long as this value and is closed when it
/// is dropped, whichever way the caller leaves scope.
#[derive(Debug)]
pub struct MrcFile {
    file: File,
    metadata: VolumeMetadata,
}

impl MrcFile {
    #[inline]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let metadata = VolumeMetadata::decode(&mut file)?;
        tracing::debug!(path = %path.display(), shape = ?metadata.shape(), "opened MRC file");
        Ok(Self { file, metadata })
    }

    #[inline]
    pub fn metadata(&self) -> &VolumeMetadata {
        &self.metadata
    }

    /// Reads the whole sample block into memory.
    #[inline]
    pub fn read_volume(&self) -> Result<Volume, Error> {
        let mut file = &self.file;
        read_volume(&mut file, &self.metadata)
    }

    #[inline]
    pub fn into_metadata(self) -> VolumeMetadata {
        self.metadata
    }
}

#[cfg(feature = "mmap")]
/// Read-only memory map of an MRC file.
#[derive(Debug)]
pub struct MrcMmap {
    mmap: memmap2::Mmap,
    metadata: VolumeMetadata,
}

#[cfg(feature = "mmap")]
impl MrcMmap {
    #[inline]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = File::open(path)?;
        // SAFETY: the map is read-only; concurrent truncation of the file by
        // another process is outside what this type guards against.
        let mmap = unsafe { memmap2::MmapOptions::new().map(&file)? };
        let metadata = VolumeMetadata::decode(&mut Cursor::new(&mmap[..]))?;
        Ok(Self { mmap, metadata })
    }

    #[inline]
    pub fn metadata(&self) -> &VolumeMetadata {
        &self.metadata
    }

    #[inline]
    pub fn read_volume(&self) -> Result<Volume, Error> {
        read_volume(&mut Cursor::new(&self.mmap[..]), &self.metadata)
    }

    /// Raw bytes of the sample block, if the file holds all of them.
    pub fn data(&self) -> Option<&[u8]> {
        let start = usize::try_from(self.metadata.data_offset()).ok()?;
        let end = start.checked_add(self.metadata.data_size()?)?;
        self.mmap.get(start..end)
    }
}

/// Opens `path` and reads header and samples in one go.
pub fn open_file(path: impl AsRef<Path>) -> Result<(VolumeMetadata, Volume), Error> {
    let file = MrcFile::open(path)?;
    let volume = file.read_volume()?;
    Ok((file.into_metadata(), volume))
}

#[cfg(feature = "mmap")]
pub fn open_mmap(path: impl AsRef<Path>) -> Result<(VolumeMetadata, Volume), Error> {
    let file = MrcMmap::open(path)?;
    let volume = file.read_volume()?;
    Ok((file.metadata, volume))
}

/// Writes `array` to `path` as an MRC file.
///
/// The array is validated and the header encoded before the file is
/// created, so a rejected array leaves an existing file untouched. Write,
/// flush and sync errors are all returned.
pub fn save_file<T, S, D>(
    path: impl AsRef<Path>,
    array: &ArrayBase<S, D>,
    voxel_size: [f32; 3],
    options: &WriteOptions,
) -> Result<(), Error>
where
    T: Sample,
    S: Data<Elem = T>,
    D: Dimension,
{
    let prepared = prepare_write(array, voxel_size, options)?;

    let mut writer = BufWriter::new(File::create(path)?);
    prepared.write_to(&mut writer)?;
    let file = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}
