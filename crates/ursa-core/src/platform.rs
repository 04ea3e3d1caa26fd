//! Platform naming helpers.

/// Architectures the image catalog is published for, in Docker Hub naming.
pub const ARCHITECTURES: [&str; 3] = ["amd64", "arm64v8", "arm32v7"];

/// Map common architecture spellings to the Docker Hub name used in
/// qualified image names. Unknown values are returned unchanged.
pub fn canonical_arch(arch: &str) -> &str {
    match arch {
        "x86_64" | "x86-64" | "x64" => "amd64",
        "aarch64" | "arm64" | "armv8" => "arm64v8",
        "armv7" | "armv7l" | "arm32" | "armhf" => "arm32v7",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert_eq!(canonical_arch("x86_64"), "amd64");
        assert_eq!(canonical_arch("aarch64"), "arm64v8");
        assert_eq!(canonical_arch("armv7l"), "arm32v7");
        assert_eq!(canonical_arch("arm64v8"), "arm64v8");
        assert_eq!(canonical_arch("s390x"), "s390x");
    }
}
