//! Pre-build validation of image sets.

use crate::error::{Duplicate, Error, Result};
use crate::image::ImageNode;
use std::collections::HashMap;

/// Collect every qualified name carried by more than one image, in order of
/// first appearance.
pub fn find_duplicates<'a>(images: impl IntoIterator<Item = &'a ImageNode>) -> Vec<Duplicate> {
    let mut order: Vec<String> = Vec::new();
    let mut seen: HashMap<String, Vec<usize>> = HashMap::new();

    for image in images {
        let name = image.qualified_name();
        let indices = seen.entry(name.clone()).or_default();
        if indices.is_empty() {
            order.push(name);
        }
        indices.push(image.id().index());
    }

    order
        .into_iter()
        .filter_map(|name| {
            let indices = seen.remove(&name)?;
            (indices.len() > 1).then_some(Duplicate {
                qualified_name: name,
                indices,
            })
        })
        .collect()
}

/// Fail with [`Error::DuplicateImage`] reporting all collisions at once.
pub fn validate<'a>(images: impl IntoIterator<Item = &'a ImageNode>) -> Result<()> {
    let duplicates = find_duplicates(images);
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(Error::DuplicateImage { duplicates })
    }
}
