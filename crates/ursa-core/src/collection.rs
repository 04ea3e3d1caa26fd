//! Image collections.
//!
//! [`ImageCollection`] is an append-only arena: each [`ImageNode`] lives at
//! the index of its [`ImageId`], and a base reference is just another index.
//! [`ImageSet`] is a borrowed, ordered selection of that arena, which is
//! what filtering produces and what the scheduler orders.

use crate::error::{Error, Result};
use crate::filter::ImageFilter;
use crate::ids::ImageId;
use crate::image::{Base, ImageNode, ImageSpec, ResolvedImage};
use crate::validation;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    images: Vec<ImageNode>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: impl IntoIterator<Item = ImageSpec>) -> Result<Self> {
        let mut collection = Self::new();
        collection.extend(specs)?;
        Ok(collection)
    }

    /// Resolve `spec` against its base and append it.
    pub fn push(&mut self, spec: ImageSpec) -> Result<ImageId> {
        let id = ImageId::new(self.images.len());
        let parent = match spec.base() {
            Base::Image(base_id) => Some(self.get(*base_id).ok_or(Error::UnknownImage(*base_id))?),
            Base::External(_) => None,
        };
        let node = spec.resolve(id, parent)?;
        self.images.push(node);
        Ok(id)
    }

    /// Append specs in order, stopping at the first invalid one.
    pub fn extend(&mut self, specs: impl IntoIterator<Item = ImageSpec>) -> Result<Vec<ImageId>> {
        specs.into_iter().map(|spec| self.push(spec)).collect()
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageNode> {
        self.images.get(id.index())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageNode> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Every image, in insertion order.
    pub fn all(&self) -> ImageSet<'_> {
        ImageSet {
            collection: self,
            ids: self.images.iter().map(ImageNode::id).collect(),
        }
    }

    /// An explicit selection, kept in the given order. Repeated ids are
    /// dropped, the first occurrence wins.
    pub fn select(&self, ids: impl IntoIterator<Item = ImageId>) -> Result<ImageSet<'_>> {
        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for id in ids {
            self.get(id).ok_or(Error::UnknownImage(id))?;
            if seen.insert(id) {
                selected.push(id);
            }
        }
        let ids = selected;
        Ok(ImageSet {
            collection: self,
            ids,
        })
    }

    /// Lazily yield the images matching every predicate of `filter`.
    pub fn filter<'a>(&'a self, filter: &'a ImageFilter) -> impl Iterator<Item = &'a ImageNode> + 'a {
        self.images.iter().filter(move |image| filter.matches(image))
    }

    /// The single image matching `filter`.
    pub fn get_one(&self, filter: &ImageFilter) -> Result<&ImageNode> {
        let mut matches = self.images.iter().filter(|image| filter.matches(image));
        let first = matches.next().ok_or(Error::ImageNotFound)?;
        let rest: Vec<&ImageNode> = matches.collect();
        if rest.is_empty() {
            Ok(first)
        } else {
            Err(Error::AmbiguousImage(
                std::iter::once(first)
                    .chain(rest)
                    .map(ImageNode::qualified_name)
                    .collect(),
            ))
        }
    }

    /// Point an existing image at a different base.
    ///
    /// Inherited attributes are not re-resolved. This is the only mutation
    /// that can introduce a cycle, which ordering will then report.
    pub fn rebase(&mut self, id: ImageId, base: impl Into<Base>) -> Result<()> {
        let base = base.into();
        if let Base::Image(base_id) = &base {
            self.get(*base_id).ok_or(Error::UnknownImage(*base_id))?;
        }
        let node = self.images.get_mut(id.index()).ok_or(Error::UnknownImage(id))?;
        node.set_base(base);
        Ok(())
    }

    /// Ancestors of `id`, root first, excluding the image itself.
    pub fn ancestors(&self, id: ImageId) -> Result<Vec<ImageId>> {
        let mut current = self.get(id).ok_or(Error::UnknownImage(id))?;
        let mut chain = Vec::new();
        let mut visited = HashSet::from([id]);

        while let Base::Image(base_id) = current.base() {
            if !visited.insert(*base_id) {
                // The loop either closes on `id` itself or on an ancestor.
                let cycle = match chain.iter().position(|a| a == base_id) {
                    Some(pos) => chain[pos..].to_vec(),
                    None => std::iter::once(id).chain(chain).collect(),
                };
                return Err(Error::CyclicDependency {
                    images: cycle
                        .into_iter()
                        .filter_map(|a| self.get(a).map(ImageNode::qualified_name))
                        .collect(),
                });
            }
            chain.push(*base_id);
            current = self.get(*base_id).ok_or(Error::UnknownImage(*base_id))?;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Flatten the ancestry of `id` for a build action.
    pub fn resolve(&self, id: ImageId) -> Result<ResolvedImage> {
        let image = self.get(id).ok_or(Error::UnknownImage(id))?;
        let ancestors = self.ancestors(id)?;

        let root_node = match ancestors.first() {
            Some(root) => self.get(*root).ok_or(Error::UnknownImage(*root))?,
            None => image,
        };
        let root = match root_node.base() {
            Base::External(name) => name.clone(),
            Base::Image(base_id) => return Err(Error::UnknownImage(*base_id)),
        };

        let (from, base_id) = match image.base() {
            Base::External(name) => (name.clone(), None),
            Base::Image(base_id) => {
                let parent = self.get(*base_id).ok_or(Error::UnknownImage(*base_id))?;
                (parent.reference(), Some(*base_id))
            }
        };

        let inherited_steps = ancestors
            .iter()
            .filter_map(|a| self.get(*a))
            .flat_map(|a| a.steps().iter().cloned())
            .collect();

        Ok(ResolvedImage {
            id,
            qualified_name: image.qualified_name(),
            reference: image.reference(),
            from,
            base_id,
            root,
            inherited_steps,
            steps: image.steps().to_vec(),
            runtime: image.runtime().map(str::to_string),
        })
    }

    /// Check qualified-name uniqueness over the whole collection.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self.iter())
    }
}

impl<'a> IntoIterator for &'a ImageCollection {
    type Item = &'a ImageNode;
    type IntoIter = std::slice::Iter<'a, ImageNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ordered, read-only view over part of an [`ImageCollection`].
#[derive(Debug, Clone)]
pub struct ImageSet<'a> {
    collection: &'a ImageCollection,
    ids: Vec<ImageId>,
}

impl<'a> ImageSet<'a> {
    pub fn collection(&self) -> &'a ImageCollection {
        self.collection
    }

    pub fn ids(&self) -> &[ImageId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ImageNode> + '_ {
        let collection = self.collection;
        self.ids.iter().filter_map(move |id| collection.get(*id))
    }

    /// Narrow the view, keeping relative order.
    pub fn filter(&self, filter: &ImageFilter) -> ImageSet<'a> {
        ImageSet {
            collection: self.collection,
            ids: self
                .iter()
                .filter(|image| filter.matches(image))
                .map(ImageNode::id)
                .collect(),
        }
    }
}
