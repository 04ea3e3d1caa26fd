//! Built-in image catalog.
//!
//! Every image has python and pip installed because the buildbot worker
//! needs them, and each image gets a `worker` tagged child that installs
//! and runs the worker.

use ursa_core::platform::ARCHITECTURES;
use ursa_core::steps::{apk, apt, conda, mkdir, pip, symlink};
use ursa_core::{Command, ImageCollection, ImageId, ImageSpec, Result, Step};

/// Files referenced by `ADD` steps, relative to the build context.
const ASSETS: &str = "docker";

const UBUNTU_PKGS: &[&str] = &[
    "autoconf",
    "bison",
    "ca-certificates",
    "ccache",
    "cmake",
    "flex",
    "g++",
    "gcc",
    "git",
    "libboost-filesystem-dev",
    "libboost-regex-dev",
    "libboost-system-dev",
    "libbz2-dev",
    "libgflags-dev",
    "libgoogle-glog-dev",
    "liblz4-dev",
    "libre2-dev",
    "libsnappy-dev",
    "libssl-dev",
    "libzstd-dev",
    "make",
    "ninja-build",
    "pkg-config",
    "rapidjson-dev",
    "thrift-compiler",
    "tzdata",
    "wget",
    "zlib1g-dev",
];

const ALPINE_PKGS: &[&str] = &[
    "autoconf",
    "bash",
    "bison",
    "boost-dev",
    "cmake",
    "flex",
    "g++",
    "gcc",
    "git",
    "gzip",
    "make",
    "musl-dev",
    "ninja",
    "openssl-dev",
    "wget",
    "zlib-dev",
];

const PYTHON_SYMLINKS: &[(&str, &str)] = &[
    ("/usr/local/bin/python", "/usr/bin/python3"),
    ("/usr/local/bin/pip", "/usr/bin/pip3"),
];

const WORKER_COMMAND: &str = "twistd --pidfile= -ny buildbot.tac";

fn asset(file: &str) -> String {
    format!("{ASSETS}/{file}")
}

fn with_extra<'a>(packages: &[&'a str], extra: &[&'a str]) -> Vec<&'a str> {
    packages.iter().chain(extra).copied().collect()
}

fn python_steps() -> Vec<Step> {
    vec![
        Step::add(asset("requirements.txt")),
        Step::add(asset("requirements-test.txt")),
        Step::run(pip(&["cython"], &["requirements.txt"])),
        Step::run(pip(&[], &["requirements-test.txt"])),
    ]
}

/// Install python 3 with apt and make it the default interpreter.
fn apt_python_steps(packages: &[&str]) -> Vec<Step> {
    vec![
        Step::run(apt(&with_extra(packages, &["python3", "python3-pip"]))),
        Step::run(symlink(PYTHON_SYMLINKS)),
    ]
}

fn worker_steps(exec_form: bool) -> Vec<Step> {
    // The conda images use a login shell entrypoint which needs the exec form.
    let cmd = if exec_form {
        Command::exec([WORKER_COMMAND])
    } else {
        Command::Shell(WORKER_COMMAND.to_string())
    };
    vec![
        Step::run(pip(&["buildbot-worker"], &[])),
        Step::run(mkdir(&["/buildbot"])),
        Step::add_to(asset("buildbot.tac"), "/buildbot/buildbot.tac"),
        Step::workdir("/buildbot"),
        Step::cmd(cmd),
    ]
}

fn os_images(images: &mut ImageCollection, org: &str) -> Result<()> {
    for arch in ARCHITECTURES {
        for version in ["16.04", "18.04"] {
            let title = format!("{} Ubuntu {version}", arch.to_uppercase());
            let cpp = images.push(
                ImageSpec::new("cpp", format!("{arch}/ubuntu:{version}"))
                    .arch(arch)
                    .os(format!("ubuntu-{version}"))
                    .org(org)
                    .title(format!("{title} C++"))
                    .steps(apt_python_steps(UBUNTU_PKGS)),
            )?;
            images.push(
                ImageSpec::new("python-3", cpp)
                    .title(format!("{title} Python 3"))
                    .steps(python_steps()),
            )?;

            if version == "18.04" {
                images.push(
                    ImageSpec::new("cpp-benchmark", cpp)
                        .title(format!("{title} C++ Benchmark"))
                        .step(Step::run(apt(&["libbenchmark-dev"])))
                        .step(Step::run(pip(&["click", "pandas"], &[]))),
                )?;
            }
        }

        let version = "3.9";
        let title = format!("{} Alpine {version}", arch.to_uppercase());
        let cpp = images.push(
            ImageSpec::new("cpp", format!("{arch}/alpine:{version}"))
                .arch(arch)
                .os(format!("alpine-{version}"))
                .org(org)
                .title(format!("{title} C++"))
                .step(Step::run(apk(&with_extra(ALPINE_PKGS, &["python3-dev", "py3-pip"]))))
                .step(Step::run(symlink(PYTHON_SYMLINKS))),
        )?;
        images.push(
            ImageSpec::new("python-3", cpp)
                .title(format!("{title} Python 3"))
                .steps(python_steps()),
        )?;
    }
    Ok(())
}

fn conda_images(images: &mut ImageCollection, org: &str) -> Result<()> {
    let arch = "amd64";
    let title = format!("{} Conda", arch.to_uppercase());

    let base = images.push(
        ImageSpec::new("base", format!("{arch}/ubuntu:18.04"))
            .arch(arch)
            .os("ubuntu-18.04")
            .variant("conda")
            .org(org)
            .title(title.clone())
            .steps([
                Step::run(apt(&["wget"])),
                Step::env([("PATH", "/opt/conda/bin:$PATH")]),
                Step::add(asset("install_conda.sh")),
                Step::run(format!("/install_conda.sh {arch} /opt/conda")),
                Step::shell(["/bin/bash", "-l", "-c"]),
                Step::entrypoint(Command::exec(["/bin/bash", "-l", "-c"])),
            ]),
    )?;
    images.push(
        ImageSpec::new("crossbow", base)
            .title(format!("{title} Crossbow"))
            .step(Step::add(asset("conda-crossbow.txt")))
            .step(Step::run(conda(&["git", "twisted"], &["conda-crossbow.txt"]))),
    )?;
    let cpp = images.push(
        ImageSpec::new("cpp", base)
            .title(format!("{title} C++"))
            .step(Step::add(asset("conda-linux.txt")))
            .step(Step::add(asset("conda-cpp.txt")))
            .step(Step::run(conda(&[], &["conda-linux.txt", "conda-cpp.txt"]))),
    )?;
    images.push(
        ImageSpec::new("cpp-benchmark", cpp)
            .title(format!("{title} C++ Benchmark"))
            .step(Step::run(conda(&["benchmark", "click", "pandas"], &[]))),
    )?;

    for version in ["2.7", "3.6", "3.7"] {
        images.push(
            ImageSpec::new(format!("python-{version}"), cpp)
                .title(format!("{title} Python {version}"))
                .step(Step::add(asset("conda-python.txt")))
                .step(Step::run(conda(
                    &[format!("python={version}").as_str()],
                    &["conda-python.txt"],
                ))),
        )?;
    }
    Ok(())
}

fn cuda_images(images: &mut ImageCollection, org: &str) -> Result<()> {
    let arch = "amd64";
    let version = "10.0";
    let title = format!("{} Nvidia Cuda {version}", arch.to_uppercase());

    let cpp = images.push(
        ImageSpec::new("cpp", format!("nvidia/cuda:{version}-devel-ubuntu18.04"))
            .arch(arch)
            .os("ubuntu-18.04")
            .variant("cuda")
            .org(org)
            // containers must be started with `docker run --runtime=nvidia`
            .runtime("nvidia")
            .title(format!("{title} C++"))
            .steps(apt_python_steps(UBUNTU_PKGS)),
    )?;
    images.push(
        ImageSpec::new("python-3", cpp)
            .title(format!("{title} Python 3"))
            .steps(python_steps()),
    )?;
    Ok(())
}

/// Language toolchain images on top of the official Debian based images.
fn toolchain_images(images: &mut ImageCollection, org: &str) -> Result<()> {
    let arch = "amd64";
    let upper = arch.to_uppercase();
    let mut toolchains = Vec::new();

    for version in ["8", "11"] {
        toolchains.push((
            format!("java-{version}"),
            format!("{arch}/maven:3-jdk-{version}"),
            format!("{upper} Java OpenJDK {version}"),
        ));
    }
    for version in ["1.12.6", "1.11.11"] {
        toolchains.push((
            format!("go-{version}"),
            format!("{arch}/golang:{version}-stretch"),
            format!("{upper} Debian 9 Go {version}"),
        ));
    }
    toolchains.push((
        "rust-1.35".to_string(),
        format!("{arch}/rust:1.35-stretch"),
        format!("{upper} Debian 9 Rust 1.35"),
    ));

    for (name, base, title) in toolchains {
        images.push(
            ImageSpec::new(name, base)
                .arch(arch)
                .os("debian-9")
                .org(org)
                .title(title)
                .steps(apt_python_steps(&[])),
        )?;
    }

    images.push(
        ImageSpec::new("ursabot", "python:3.7")
            .arch(arch)
            .os("debian-9")
            .org(org)
            .title("Ursabot Python 3.7")
            .step(Step::add(asset("requirements-ursabot.txt")))
            .step(Step::run(pip(&[], &["requirements-ursabot.txt"]))),
    )?;
    Ok(())
}

/// Add a `worker` tagged child for each of `ids`.
fn worker_images(images: &mut ImageCollection, ids: &[ImageId]) -> Result<()> {
    for &id in ids {
        let Some(image) = images.get(id) else {
            continue;
        };
        let spec = ImageSpec::new(image.name(), id)
            .tag("worker")
            .steps(worker_steps(image.variant() == Some("conda")));
        images.push(spec)?;
    }
    Ok(())
}

/// The complete image hierarchy, published under `org`.
pub fn catalog(org: &str) -> Result<ImageCollection> {
    let mut images = ImageCollection::new();
    os_images(&mut images, org)?;
    conda_images(&mut images, org)?;
    cuda_images(&mut images, org)?;
    toolchain_images(&mut images, org)?;

    let ids: Vec<ImageId> = images.iter().map(|image| image.id()).collect();
    worker_images(&mut images, &ids)?;
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ursa_core::ImageFilter;

    #[test]
    fn test_catalog_is_valid() {
        let images = catalog("ursalab").unwrap();
        assert_eq!(images.len(), 72);
        images.validate().unwrap();

        let plan = ursa_scheduler::plan(&images.all()).unwrap();
        assert_eq!(plan.len(), 72);
    }

    #[test]
    fn test_every_image_has_a_worker() {
        let images = catalog("ursalab").unwrap();
        let workers = ImageFilter::new().tag("worker");
        let plain = ImageFilter::new().tag("");
        assert_eq!(images.filter(&workers).count(), 36);
        assert_eq!(images.filter(&plain).count(), 36);

        for worker in images.filter(&workers) {
            let base = worker.base().clone();
            let ursa_core::Base::Image(base) = base else {
                panic!("{} has an external base", worker.qualified_name());
            };
            assert_eq!(images.get(base).unwrap().name(), worker.name());
        }
    }

    #[test]
    fn test_arm_images() {
        let images = catalog("ursalab").unwrap();
        let filter = ImageFilter::new().arch("arm64v8").tag("");
        let names: Vec<String> = images
            .filter(&filter)
            .map(|image| image.qualified_name())
            .collect();
        assert_eq!(
            names,
            vec![
                "arm64v8-ubuntu-16.04-cpp",
                "arm64v8-ubuntu-16.04-python-3",
                "arm64v8-ubuntu-18.04-cpp",
                "arm64v8-ubuntu-18.04-python-3",
                "arm64v8-ubuntu-18.04-cpp-benchmark",
                "arm64v8-alpine-3.9-cpp",
                "arm64v8-alpine-3.9-python-3",
            ]
        );
    }

    #[test]
    fn test_conda_worker_uses_exec_form() {
        let images = catalog("ursalab").unwrap();
        let filter = ImageFilter::new().variant("conda").name("cpp").tag("worker");
        let worker = images.get_one(&filter).unwrap();
        let resolved = images.resolve(worker.id()).unwrap();

        let dockerfile = resolved.dockerfile().to_string();
        assert!(dockerfile.starts_with("FROM ursalab/amd64-ubuntu-18.04-conda-cpp:latest\n"));
        assert!(dockerfile.ends_with("CMD [\"twistd --pidfile= -ny buildbot.tac\"]\n"));
        assert_eq!(resolved.runtime, None);
    }

    #[test]
    fn test_cuda_runtime_is_inherited() {
        let images = catalog("ursalab").unwrap();
        let filter = ImageFilter::new().variant("cuda").name("python-3").tag("worker");
        let worker = images.get_one(&filter).unwrap();
        assert_eq!(worker.runtime(), Some("nvidia"));
        assert_eq!(
            worker.reference(),
            "ursalab/amd64-ubuntu-18.04-cuda-python-3:worker"
        );
    }
}
