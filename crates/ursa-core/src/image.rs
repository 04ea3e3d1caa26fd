//! Image definitions.
//!
//! An [`ImageSpec`] is what a configuration author writes; inserting it into
//! an [`ImageCollection`](crate::ImageCollection) resolves the platform
//! attributes inherited from its base and yields a flat, immutable
//! [`ImageNode`].

use crate::dockerfile::Dockerfile;
use crate::error::{Error, Result};
use crate::ids::ImageId;
use crate::steps::Step;
use serde::{Deserialize, Serialize};

/// The image a node is built on top of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Base {
    /// Another image of the same collection.
    Image(ImageId),
    /// An image pulled from a registry, a leaf of the hierarchy.
    External(String),
}

impl From<ImageId> for Base {
    fn from(id: ImageId) -> Self {
        Base::Image(id)
    }
}

impl From<&str> for Base {
    fn from(name: &str) -> Self {
        Base::External(name.to_string())
    }
}

impl From<String> for Base {
    fn from(name: String) -> Self {
        Base::External(name)
    }
}

/// Builder for an image definition.
#[derive(Debug, Clone)]
pub struct ImageSpec {
    name: String,
    base: Base,
    tag: Option<String>,
    arch: Option<String>,
    os: Option<String>,
    variant: Option<String>,
    org: Option<String>,
    title: Option<String>,
    runtime: Option<String>,
    steps: Vec<Step>,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

impl ImageSpec {
    pub fn new(name: impl Into<String>, base: impl Into<Base>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            tag: None,
            arch: None,
            os: None,
            variant: None,
            org: None,
            title: None,
            runtime: None,
            steps: Vec::new(),
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = non_empty(tag.into());
        self
    }

    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    pub fn os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    pub fn variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Registry organization the image is pushed under.
    pub fn org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Container runtime required to run the image, e.g. `nvidia`.
    pub fn runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &Base {
        &self.base
    }

    /// Resolve inherited attributes against the already inserted parent.
    ///
    /// `parent` must be the node referenced by `Base::Image`, and `None`
    /// for an external base.
    pub(crate) fn resolve(self, id: ImageId, parent: Option<&ImageNode>) -> Result<ImageNode> {
        if self.name.is_empty() {
            return Err(Error::Configuration("image name must not be empty".into()));
        }

        let inherit = |own: Option<String>, from: fn(&ImageNode) -> Option<&str>| {
            own.or_else(|| parent.and_then(from).map(str::to_string))
        };

        let arch = inherit(self.arch, |p| Some(p.arch.as_str()));
        let os = inherit(self.os, |p| Some(p.os.as_str()));
        let (Some(arch), Some(os)) = (arch.and_then(non_empty), os.and_then(non_empty)) else {
            return Err(Error::Configuration(match &self.base {
                Base::External(name) => format!(
                    "image `{}` is based on external image `{}` and must set both arch and os",
                    self.name, name
                ),
                Base::Image(base_id) => format!(
                    "image `{}` overrides arch or os of base image {} with an empty value",
                    self.name, base_id
                ),
            }));
        };

        Ok(ImageNode {
            id,
            name: self.name,
            base: self.base,
            tag: self.tag,
            arch,
            os,
            variant: inherit(self.variant, |p| p.variant.as_deref()).and_then(non_empty),
            org: inherit(self.org, |p| p.org.as_deref()),
            title: inherit(self.title, |p| p.title.as_deref()),
            runtime: inherit(self.runtime, |p| p.runtime.as_deref()),
            steps: self.steps,
        })
    }
}

/// A resolved image definition owned by an
/// [`ImageCollection`](crate::ImageCollection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageNode {
    id: ImageId,
    name: String,
    base: Base,
    tag: Option<String>,
    arch: String,
    os: String,
    variant: Option<String>,
    org: Option<String>,
    title: Option<String>,
    runtime: Option<String>,
    steps: Vec<Step>,
}

impl ImageNode {
    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &Base {
        &self.base
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn runtime(&self) -> Option<&str> {
        self.runtime.as_deref()
    }

    /// Steps declared on this image only, without the inherited ones.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn platform(&self) -> (&str, &str, Option<&str>) {
        (&self.arch, &self.os, self.variant.as_deref())
    }

    /// `{arch}-{os}[-{variant}]-{name}`
    pub fn repository(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{}-{}-{}-{}", self.arch, self.os, variant, self.name),
            None => format!("{}-{}-{}", self.arch, self.os, self.name),
        }
    }

    /// `{arch}-{os}[-{variant}]-{name}[:{tag}]`, unique within a collection.
    pub fn qualified_name(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}:{}", self.repository(), tag),
            None => self.repository(),
        }
    }

    /// Registry reference the image is built and pushed as.
    pub fn reference(&self) -> String {
        let tag = self.tag.as_deref().unwrap_or("latest");
        match &self.org {
            Some(org) => format!("{}/{}:{}", org, self.repository(), tag),
            None => format!("{}:{}", self.repository(), tag),
        }
    }

    pub(crate) fn set_base(&mut self, base: Base) {
        self.base = base;
    }
}

impl std::fmt::Display for ImageNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// A node with its ancestry flattened, ready to be handed to a build action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedImage {
    pub id: ImageId,
    pub qualified_name: String,
    pub reference: String,
    /// Image the node is built `FROM`: the parent's registry reference or
    /// the external base name.
    pub from: String,
    /// Parent image when the base belongs to the collection.
    pub base_id: Option<ImageId>,
    /// External image at the root of the hierarchy.
    pub root: String,
    /// Steps of every ancestor, root first.
    pub inherited_steps: Vec<Step>,
    pub steps: Vec<Step>,
    pub runtime: Option<String>,
}

impl ResolvedImage {
    /// Inherited steps followed by the node's own steps.
    pub fn all_steps(&self) -> impl Iterator<Item = &Step> {
        self.inherited_steps.iter().chain(self.steps.iter())
    }

    /// Dockerfile layered on top of the parent image.
    pub fn dockerfile(&self) -> Dockerfile {
        Dockerfile::from_steps(self.from.clone(), &self.steps)
    }

    /// Self-contained Dockerfile built straight from the root image.
    pub fn flattened_dockerfile(&self) -> Dockerfile {
        Dockerfile::from_steps(self.root.clone(), self.all_steps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ImageNode {
        ImageSpec::new("mother", "ubuntu:18.04")
            .arch("amd64")
            .os("ubuntu-18.04")
            .org("ursalab")
            .resolve(ImageId::new(0), None)
            .unwrap()
    }

    #[test]
    fn test_qualified_names() {
        let mother = root();
        assert_eq!(mother.qualified_name(), "amd64-ubuntu-18.04-mother");
        assert_eq!(mother.reference(), "ursalab/amd64-ubuntu-18.04-mother:latest");
        assert_eq!(mother.variant(), None);

        let stepmother = ImageSpec::new("mother", "centos:7")
            .arch("amd64")
            .os("centos-7")
            .variant("step")
            .tag("v1")
            .resolve(ImageId::new(1), None)
            .unwrap();
        assert_eq!(stepmother.qualified_name(), "amd64-centos-7-step-mother:v1");
        assert_eq!(stepmother.reference(), "amd64-centos-7-step-mother:v1");
    }

    #[test]
    fn test_external_base_requires_platform() {
        let err = ImageSpec::new("orphan", "ubuntu:18.04")
            .arch("amd64")
            .resolve(ImageId::new(0), None)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = ImageSpec::new("orphan", "ubuntu:18.04")
            .os("ubuntu-18.04")
            .resolve(ImageId::new(0), None)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_child_cannot_blank_out_platform() {
        let mother = root();
        let err = ImageSpec::new("child", mother.id())
            .arch("")
            .resolve(ImageId::new(1), Some(&mother))
            .unwrap_err();
        match err {
            Error::Configuration(msg) => {
                assert!(msg.contains("base image #0"), "{msg}");
                assert!(!msg.contains("external"), "{msg}");
            }
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = ImageSpec::new("", "ubuntu:18.04")
            .arch("amd64")
            .os("ubuntu-18.04")
            .resolve(ImageId::new(0), None)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_child_inherits_platform() {
        let mother = root();
        let child = ImageSpec::new("child", mother.id())
            .resolve(ImageId::new(1), Some(&mother))
            .unwrap();
        assert_eq!(child.platform(), ("amd64", "ubuntu-18.04", None));
        assert_eq!(child.org(), Some("ursalab"));
        assert_eq!(child.tag(), None);

        let variant = ImageSpec::new("variant", mother.id())
            .variant("conda")
            .resolve(ImageId::new(2), Some(&mother))
            .unwrap();
        assert_eq!(variant.qualified_name(), "amd64-ubuntu-18.04-conda-variant");
    }

    #[test]
    fn test_override_leaves_other_attributes() {
        let mother = root();
        let child = ImageSpec::new("child", mother.id())
            .os("ubuntu-20.04")
            .resolve(ImageId::new(1), Some(&mother))
            .unwrap();
        assert_eq!(child.os(), "ubuntu-20.04");
        assert_eq!(child.arch(), "amd64");
        assert_eq!(child.variant(), None);
    }
}
