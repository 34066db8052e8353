use kernel_addresses::VirtualAddress;
use kernel_hal::{ImageError, ImageSource, LoadInfo};
use kernel_info::memory::{MEM_INVALID_PAGES, PAGE_SIZE};
use std::collections::BTreeMap;

/// An executable image held in memory.
///
/// Text is padded to a whole number of pages, matching what the on-disk
/// format guarantees; data and bss are byte-granular.
#[derive(Clone)]
pub struct SimImage {
    text: Vec<u8>,
    data: Vec<u8>,
    bss_size: u64,
    entry: VirtualAddress,
    /// Present the image as this long when streaming, to model a file
    /// truncated after its headers were written.
    truncated_len: Option<usize>,
}

impl SimImage {
    /// An image with the given text bytes, no data, no bss, entry at the
    /// first text address.
    #[must_use]
    pub fn new(text: &[u8]) -> Self {
        let mut text = text.to_vec();
        let padded = text.len().next_multiple_of(PAGE_SIZE as usize).max(PAGE_SIZE as usize);
        text.resize(padded, 0);
        Self {
            text,
            data: Vec::new(),
            bss_size: 0,
            entry: VirtualAddress::new(MEM_INVALID_PAGES as u64 * PAGE_SIZE),
            truncated_len: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }

    #[must_use]
    pub const fn with_bss(mut self, bss_size: u64) -> Self {
        self.bss_size = bss_size;
        self
    }

    /// Pretend the file ends after `len` bytes of text+data.
    #[must_use]
    pub const fn truncated(mut self, len: usize) -> Self {
        self.truncated_len = Some(len);
        self
    }
}

/// An in-memory program store implementing the loader contract.
#[derive(Default)]
pub struct SimImages {
    images: BTreeMap<String, SimImage>,
}

/// Read cursor over one opened image.
pub struct SimHandle {
    name: String,
    pos: usize,
}

impl SimImages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image(mut self, name: &str, image: SimImage) -> Self {
        self.images.insert(name.to_string(), image);
        self
    }
}

impl ImageSource for SimImages {
    type Handle = SimHandle;

    fn open(&mut self, name: &str) -> Result<Self::Handle, ImageError> {
        if !self.images.contains_key(name) {
            return Err(ImageError::NotFound);
        }
        Ok(SimHandle {
            name: name.to_string(),
            pos: 0,
        })
    }

    fn info(&self, handle: &Self::Handle) -> LoadInfo {
        let image = &self.images[&handle.name];
        LoadInfo {
            text_size: image.text.len() as u64,
            data_size: image.data.len() as u64,
            bss_size: image.bss_size,
            entry: image.entry,
        }
    }

    fn read(&mut self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<(), ImageError> {
        let image = &self.images[&handle.name];
        let available = image
            .truncated_len
            .unwrap_or(image.text.len() + image.data.len());
        if handle.pos + buf.len() > available {
            return Err(ImageError::Read);
        }
        for (i, byte) in buf.iter_mut().enumerate() {
            let pos = handle.pos + i;
            *byte = if pos < image.text.len() {
                image.text[pos]
            } else {
                image.data[pos - image.text.len()]
            };
        }
        handle.pos += buf.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_padded_to_pages() {
        let image = SimImage::new(b"\x01\x02\x03");
        assert_eq!(image.text.len() as u64 % PAGE_SIZE, 0);
    }

    #[test]
    fn truncated_image_fails_the_read() {
        let mut store =
            SimImages::new().with_image("bad", SimImage::new(&[0xAA; 100]).truncated(64));
        let mut handle = store.open("bad").unwrap();
        let mut buf = vec![0u8; 128];
        assert!(matches!(
            store.read(&mut handle, &mut buf),
            Err(ImageError::Read)
        ));
    }

    #[test]
    fn unknown_name_does_not_resolve() {
        let mut store = SimImages::new();
        assert!(matches!(store.open("ghost"), Err(ImageError::NotFound)));
    }
}
