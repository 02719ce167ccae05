//! Tests for image file and attribute constraint checks.

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use proptest::prelude::*;
use reqguard::image::{
    AttributeConstraints, Dimensions, FileConstraints, FileStat, ImageEnv, ImageIdentifier,
    ImageIdentity, ImageValidator, ProbeError, Reason, SystemEnv,
};
use serde_json::json;

struct MockStat(Result<u64, ProbeError>);

#[async_trait]
impl FileStat for MockStat {
    async fn file_size(&self, _path: &Path) -> Result<u64, ProbeError> {
        self.0.clone()
    }
}

struct MockIdentifier(Result<ImageIdentity, ProbeError>);

#[async_trait]
impl ImageIdentifier for MockIdentifier {
    async fn identify(&self, _path: &Path) -> Result<ImageIdentity, ProbeError> {
        self.0.clone()
    }
}

struct PanickingProbe;

#[async_trait]
impl FileStat for PanickingProbe {
    async fn file_size(&self, _path: &Path) -> Result<u64, ProbeError> {
        panic!("stat exploded")
    }
}

#[async_trait]
impl ImageIdentifier for PanickingProbe {
    async fn identify(&self, _path: &Path) -> Result<ImageIdentity, ProbeError> {
        panic!("identify exploded")
    }
}

struct TestEnv<S, I> {
    stat: S,
    identifier: I,
}

impl<S: FileStat, I: ImageIdentifier> ImageEnv for TestEnv<S, I> {
    type Stat = S;
    type Identifier = I;

    fn file_stat(&self) -> &Self::Stat {
        &self.stat
    }

    fn identifier(&self) -> &Self::Identifier {
        &self.identifier
    }
}

fn sized(size: u64) -> TestEnv<MockStat, MockIdentifier> {
    TestEnv {
        stat: MockStat(Ok(size)),
        identifier: MockIdentifier(Ok(ImageIdentity::default())),
    }
}

fn identified(identity: ImageIdentity) -> TestEnv<MockStat, MockIdentifier> {
    TestEnv {
        stat: MockStat(Ok(0)),
        identifier: MockIdentifier(Ok(identity)),
    }
}

fn png(width: u32, height: u32) -> ImageIdentity {
    ImageIdentity {
        mime_type: None,
        format: Some("PNG".to_string()),
        size: Some(Dimensions::new(width, height)),
    }
}

// File constraints

#[tokio::test]
async fn test_real_file_within_limit() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[7u8; 2000]).unwrap();
    file.flush().unwrap();

    let env = SystemEnv::new(MockIdentifier(Ok(ImageIdentity::default())));
    let validator = ImageValidator::new(file.path());

    let size = validator
        .assert_file_constraints(&env, &FileConstraints { max_size: 2000 })
        .await
        .unwrap();
    assert_eq!(size, 2000);

    let err = validator
        .assert_file_constraints(&env, &FileConstraints { max_size: 1999 })
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Image file does not meet given file constraints");
    let check = err.result().unwrap();
    assert!(!check.is_valid);
    assert_eq!(check.reasons.iter().copied().collect::<Vec<_>>(), vec![Reason::MaxFileSize]);
}

#[tokio::test]
async fn test_missing_file_is_a_fault() {
    let env = SystemEnv::new(MockIdentifier(Ok(ImageIdentity::default())));
    let err = ImageValidator::new("/no/such/image.png")
        .assert_file_constraints(&env, &FileConstraints { max_size: 10 })
        .await
        .unwrap_err();

    assert!(err.result().is_none());
    assert!(matches!(err.inner_error(), Some(ProbeError::Io { .. })));
    assert!(err.message().starts_with("Error while retrieving stats for file"));
}

#[tokio::test]
async fn test_empty_path_is_a_fault() {
    let err = ImageValidator::new("")
        .assert_file_constraints(&sized(1), &FileConstraints { max_size: 10 })
        .await
        .unwrap_err();
    assert_eq!(err.inner_error(), Some(&ProbeError::InvalidPath));
}

#[tokio::test]
async fn test_panicking_stat_is_a_fault() {
    let env = TestEnv {
        stat: PanickingProbe,
        identifier: PanickingProbe,
    };
    let err = ImageValidator::new("a.png")
        .assert_file_constraints(&env, &FileConstraints { max_size: 10 })
        .await
        .unwrap_err();
    assert_eq!(
        err.inner_error(),
        Some(&ProbeError::Panicked("stat exploded".to_string()))
    );
}

proptest! {
    #[test]
    fn prop_file_size_limit(size in 0u64..10_000, max_size in 0u64..10_000) {
        let result = futures::executor::block_on(
            ImageValidator::new("upload.png")
                .assert_file_constraints(&sized(size), &FileConstraints { max_size }),
        );

        if size > max_size {
            let err = result.unwrap_err();
            let check = err.result().unwrap();
            prop_assert!(check.has_reason(Reason::MaxFileSize));
            prop_assert_eq!(check.reasons.len(), 1);
        } else {
            prop_assert_eq!(result.unwrap(), size);
        }
    }
}

// Attribute constraints

#[tokio::test]
async fn test_mime_type_from_format() {
    let constraints = AttributeConstraints::new().mime_types(["image/png"]);
    let check = ImageValidator::new("a.png")
        .assert_attribute_constraints(&identified(png(10, 10)), &constraints)
        .await
        .unwrap();

    assert!(check.is_valid);
    assert_eq!(check.metadata.mime_type.as_deref(), Some("image/png"));
    assert!(check.metadata.size.is_none());
}

#[tokio::test]
async fn test_disallowed_mime_type() {
    let identity = ImageIdentity {
        mime_type: Some("image/gif".to_string()),
        ..png(10, 10)
    };
    let constraints = AttributeConstraints::new().mime_types(["image/png", "image/jpeg"]);
    let err = ImageValidator::new("a.gif")
        .assert_attribute_constraints(&identified(identity), &constraints)
        .await
        .unwrap_err();

    assert_eq!(err.message(), "Image attributes does not match given constraints");
    let check = err.result().unwrap();
    assert_eq!(check.reasons.iter().copied().collect::<Vec<_>>(), vec![Reason::MimeType]);
    assert_eq!(check.conditions.as_ref(), Some(&constraints));
}

#[tokio::test]
async fn test_unknown_mime_type() {
    let identity = ImageIdentity {
        mime_type: None,
        format: None,
        size: None,
    };
    let constraints = AttributeConstraints::new().mime_types(["image/png"]);
    let err = ImageValidator::new("a")
        .assert_attribute_constraints(&identified(identity), &constraints)
        .await
        .unwrap_err();
    assert!(err.result().unwrap().has_reason(Reason::MimeType));
}

#[tokio::test]
async fn test_reason_order() {
    let identity = ImageIdentity {
        mime_type: Some("image/bmp".to_string()),
        ..png(5, 5)
    };
    let constraints = AttributeConstraints::new()
        .mime_types(["image/png"])
        .min_width(100)
        .min_height(100);

    let err = ImageValidator::new("a.bmp")
        .assert_attribute_constraints(&identified(identity), &constraints)
        .await
        .unwrap_err();

    let check = err.result().unwrap();
    assert_eq!(
        check.reasons.iter().copied().collect::<Vec<_>>(),
        vec![Reason::MimeType, Reason::MinWidth, Reason::MinHeight]
    );
    assert_eq!(
        serde_json::to_value(&check.metadata).unwrap(),
        json!({"mimeType": "image/bmp", "size": {"width": 5, "height": 5}})
    );
}

#[tokio::test]
async fn test_missing_size() {
    let identity = ImageIdentity {
        size: None,
        ..png(0, 0)
    };
    let constraints = AttributeConstraints::new().min_width(10);
    let err = ImageValidator::new("a.png")
        .assert_attribute_constraints(&identified(identity), &constraints)
        .await
        .unwrap_err();

    let check = err.result().unwrap();
    assert_eq!(check.reasons.iter().copied().collect::<Vec<_>>(), vec![Reason::Dimensions]);
}

#[tokio::test]
async fn test_dimensions_met() {
    let constraints = AttributeConstraints::new().min_width(640).min_height(480);
    let check = ImageValidator::new("a.png")
        .assert_attribute_constraints(&identified(png(640, 480)), &constraints)
        .await
        .unwrap();

    assert!(check.is_valid);
    assert!(check.reasons.is_empty());
    assert_eq!(check.metadata.size, Some(Dimensions::new(640, 480)));
}

#[tokio::test]
async fn test_identify_failure() {
    let env = TestEnv {
        stat: MockStat(Ok(0)),
        identifier: MockIdentifier(Err(ProbeError::Identify {
            path: "a.png".into(),
            reason: "corrupt header".to_string(),
        })),
    };
    let err = ImageValidator::new("a.png")
        .assert_attribute_constraints(&env, &AttributeConstraints::new().mime_types(["image/png"]))
        .await
        .unwrap_err();

    assert!(err.result().is_none());
    assert!(err.message().starts_with("Unable to retrieve image metadata for file"));
}

#[tokio::test]
async fn test_panicking_identifier() {
    let env = TestEnv {
        stat: PanickingProbe,
        identifier: PanickingProbe,
    };
    let err = ImageValidator::new("a.png")
        .assert_attribute_constraints(&env, &AttributeConstraints::new())
        .await
        .unwrap_err();
    assert!(matches!(err.inner_error(), Some(ProbeError::Panicked(msg)) if msg == "identify exploded"));
}
