//! Build ordering over realistic hierarchies.

use pretty_assertions::assert_eq;
use ursa_core::{Error, ImageCollection, ImageId, ImageSpec};
use ursa_scheduler::{BuildGraph, plan};

fn hierarchy() -> (ImageCollection, Vec<ImageId>) {
    let mut images = ImageCollection::new();
    let a = images
        .push(ImageSpec::new("a", "ubuntu:18.04").arch("amd64").os("ubuntu-18.04"))
        .unwrap();
    let b = images
        .push(ImageSpec::new("b", "centos:7").arch("arm64v8").os("centos-7"))
        .unwrap();
    let c = images.push(ImageSpec::new("c", a)).unwrap();
    let d = images.push(ImageSpec::new("d", c)).unwrap();
    let e = images.push(ImageSpec::new("e", c)).unwrap();
    let f = images.push(ImageSpec::new("f", b)).unwrap();
    let g = images.push(ImageSpec::new("g", b)).unwrap();
    let h = images.push(ImageSpec::new("h", g)).unwrap();
    let i = images.push(ImageSpec::new("i", f)).unwrap();
    let j = images.push(ImageSpec::new("j", e)).unwrap();
    let k = images.push(ImageSpec::new("k", e)).unwrap();
    // Deliberately not in dependency order.
    (images, vec![k, b, e, j, i, a, c, d, f, g, h])
}

fn names(images: &ImageCollection, ids: &[ImageId]) -> Vec<String> {
    ids.iter()
        .map(|id| images.get(*id).unwrap().name().to_string())
        .collect()
}

#[test]
fn test_every_image_follows_its_base() {
    let (images, order) = hierarchy();
    let set = images.select(order).unwrap();
    let built = BuildGraph::new(&set).topological_order().unwrap();
    assert_eq!(built.len(), set.len());

    for (pos, id) in built.iter().enumerate() {
        if let ursa_core::Base::Image(base) = images.get(*id).unwrap().base() {
            let base_pos = built.iter().position(|b| b == base).unwrap();
            assert!(base_pos < pos, "{id} built before its base {base}");
        }
    }
}

#[test]
fn test_order_is_deterministic_and_follows_selection() {
    let (images, order) = hierarchy();
    let set = images.select(order).unwrap();

    let first = BuildGraph::new(&set).topological_order().unwrap();
    let second = BuildGraph::new(&set).topological_order().unwrap();
    assert_eq!(first, second);

    // Among images ready at the same time, the earliest selected goes first.
    assert_eq!(
        names(&images, &first),
        vec!["b", "a", "c", "e", "k", "j", "d", "f", "i", "g", "h"]
    );
}

#[test]
fn test_readme_build_order() {
    let mut images = ImageCollection::new();
    let a = images
        .push(
            ImageSpec::new("conda", "continuumio/miniconda3")
                .arch("amd64")
                .os("debian-9"),
        )
        .unwrap();
    let b = images.push(ImageSpec::new("pandas", a)).unwrap();

    let set = images.all();
    assert_eq!(BuildGraph::new(&set).topological_order().unwrap(), vec![a, b]);
}

#[test]
fn test_rebased_cycle_is_reported() {
    let mut images = ImageCollection::new();
    let a = images
        .push(ImageSpec::new("a", "ubuntu:18.04").arch("amd64").os("ubuntu-18.04"))
        .unwrap();
    let b = images.push(ImageSpec::new("b", a)).unwrap();
    let c = images.push(ImageSpec::new("c", b)).unwrap();
    images.push(ImageSpec::new("d", c)).unwrap();
    images.rebase(b, c).unwrap();

    match plan(&images.all()) {
        Err(Error::CyclicDependency { images }) => {
            assert_eq!(images, vec!["amd64-ubuntu-18.04-b", "amd64-ubuntu-18.04-c"]);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_filtered_selection_orders_only_selected_images() {
    let (images, _) = hierarchy();
    let filter = ursa_core::ImageFilter::new().arch("arm64v8");
    let set = images.all().filter(&filter);
    let built = BuildGraph::new(&set).topological_order().unwrap();
    assert_eq!(names(&images, &built), vec!["b", "f", "g", "h", "i"]);
}
