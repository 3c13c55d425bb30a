//! Top-level `Load`: gzip unwrap, collection splitting, and per-image validation.
//!
//! Port of `ssfn_load`/`ssfn_mem`'s front end in `ssfn.h`. Each discovered font image
//! is returned as an owned byte buffer (even singletons, to keep ownership uniform
//! for the registry) rather than a borrowed slice, since a `FontImage` would
//! otherwise have to self-reference the buffer it's parsed from.

use crate::error::{Error, Result};
use crate::font_format::{FontImage, COLLECTION_MAGIC, MAGIC};
use crate::inflate;

/// Unwrap gzip framing (if present) and split a collection (if present) into its
/// constituent font images. Every returned buffer has already been validated with
/// `FontImage::parse`.
pub fn load_images(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let inflated = if inflate::is_gzip(data) {
        inflate::gzip_decompress(data)?
    } else {
        data.to_vec()
    };

    if inflated.len() >= 4 && &inflated[0..4] == COLLECTION_MAGIC {
        split_collection(&inflated)
    } else {
        FontImage::parse(&inflated)?;
        Ok(vec![inflated])
    }
}

fn split_collection(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    if data.len() < 8 {
        return Err(Error::BadFile);
    }
    let total = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    if total < 8 || total > data.len() {
        return Err(Error::BadFile);
    }
    let mut pos = 8usize;
    let mut out = Vec::new();
    while pos + 8 <= total {
        if &data[pos..pos + 4] != MAGIC {
            return Err(Error::BadFile);
        }
        let size = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]) as usize;
        if size == 0 || pos + size > data.len() {
            return Err(Error::BadFile);
        }
        let slice = data[pos..pos + size].to_vec();
        FontImage::parse(&slice)?;
        out.push(slice);
        pos += size;
    }
    if out.is_empty() {
        return Err(Error::BadFile);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font_format::END_MAGIC;

    fn push_u16(v: &mut Vec<u8>, x: u16) {
        v.extend_from_slice(&x.to_le_bytes());
    }
    fn push_u32(v: &mut Vec<u8>, x: u32) {
        v.extend_from_slice(&x.to_le_bytes());
    }

    fn make_font(family: u8) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(MAGIC);
        push_u32(&mut v, 0);
        v.push(family);
        v.push(0);
        v.push(10);
        v.push(16);
        v.push(12);
        v.push(14);
        push_u16(&mut v, 33);
        push_u32(&mut v, 40);
        push_u32(&mut v, 0);
        push_u32(&mut v, 0);
        push_u32(&mut v, 0);
        v.push(0);
        while v.len() < 33 {
            v.push(0);
        }
        // Matches the minimal fixture layout used in font_format's tests: a single
        // skip-to-'A' record with zero fragments.
        v.push(0xC0);
        v.push(65);
        v.extend_from_slice(&[0, 0, 8, 16, 9, 0]);
        let size = v.len() as u32 + 4;
        v.extend_from_slice(END_MAGIC);
        v[4..8].copy_from_slice(&size.to_le_bytes());
        v
    }

    #[test]
    fn loads_single_image() {
        let data = make_font(1);
        let images = load_images(&data).expect("load");
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn splits_collection_of_two() {
        let a = make_font(0);
        let b = make_font(1);
        let mut coll = Vec::new();
        coll.extend_from_slice(COLLECTION_MAGIC);
        let total = 8 + a.len() + b.len();
        push_u32(&mut coll, total as u32);
        coll.extend_from_slice(&a);
        coll.extend_from_slice(&b);
        let images = load_images(&coll).expect("load collection");
        assert_eq!(images.len(), 2);
        assert_eq!(FontImage::parse(&images[0]).unwrap().family() as u8, 0);
        assert_eq!(FontImage::parse(&images[1]).unwrap().family() as u8, 1);
    }

    #[test]
    fn rejects_truncated_collection() {
        let mut coll = Vec::new();
        coll.extend_from_slice(COLLECTION_MAGIC);
        push_u32(&mut coll, 100);
        assert!(load_images(&coll).is_err());
    }
}
