//! Integration tests for the Tsunagi crate.
//!
//! These tests run full pipelines from a scratch source directory to files on disk.

use tokio::time::timeout;
use tsunagi::error::Result;
use tsunagi::prelude::*;

mod common;
use common::{
    BLUE, RED, TEST_TIMEOUT, assert_valid_zip_file, create_animated_gif, create_corrupt_image,
    create_image, list_file_names, read_zip_entry, setup_test_dirs, zip_entry_names,
};

fn config_for(source: &Path, target: &Path) -> Result<TsunagiConfig> {
    Ok(TsunagiConfig::builder()
        .source_path(source.to_path_buf())
        .target_path(target.to_path_buf())
        .build()?)
}

#[tokio::test]
async fn test_single_group_end_to_end() -> Result<()> {
    let test_dirs = setup_test_dirs("single_group").await;
    create_image(&test_dirs.source_dir.join("shop1_1.png"), 10, 20, RED).await?;
    create_image(&test_dirs.source_dir.join("shop1_2.png"), 30, 20, BLUE).await?;
    tokio::fs::write(test_dirs.source_dir.join("other.txt"), b"not an image").await?;

    let config = config_for(&test_dirs.source_dir, &test_dirs.target_dir)?;
    let report = timeout(TEST_TIMEOUT, config.stitch_from_source())
        .await
        .expect("Test timed out")?;

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.succeeded(), 1);
    let group = report.get("shop1").expect("shop1 report");
    let output_path = test_dirs.target_dir.join("shop1.jpg");
    assert_eq!(
        group.status,
        GroupStatus::Stitched {
            output_path: output_path.clone(),
            width: 40,
            height: 20,
            images_used: 2,
        }
    );
    assert!(group.decode_failures.is_empty());

    let collection = report.collection.as_ref().expect("collection report");
    assert!(collection.findings.contains(&CollectionFinding::UnsupportedExtension(
        test_dirs.source_dir.join("other.txt")
    )));

    // The target directory did not exist before the run.
    assert_eq!(list_file_names(&test_dirs.target_dir).await, vec!["shop1.jpg"]);
    assert_eq!(image::image_dimensions(&output_path)?, (40, 20));

    let written = image::open(&output_path)?.into_rgb8();
    let left = written.get_pixel(5, 10);
    let right = written.get_pixel(25, 10);
    assert!(left[0] > 200 && left[2] < 60, "left should be red: {:?}", left);
    assert!(right[2] > 200 && right[0] < 60, "right should be blue: {:?}", right);
    Ok(())
}

#[tokio::test]
async fn test_multiple_groups_with_mixed_heights_and_formats() -> Result<()> {
    let test_dirs = setup_test_dirs("multiple_groups").await;
    let source = &test_dirs.source_dir;
    create_image(&source.join("north_store_2.jpg"), 15, 10, RED).await?;
    create_image(&source.join("north_store_1.bmp"), 5, 30, BLUE).await?;
    create_image(&source.join("north_store_10.tiff"), 20, 12, RED).await?;
    create_animated_gif(&source.join("south_1.gif"), 8, 8, &[BLUE, RED]).await?;

    let config = config_for(source, &test_dirs.target_dir)?;
    let report = config.stitch_from_source().await?;

    assert_eq!(report.succeeded(), 2);
    match &report.get("north_store").unwrap().status {
        GroupStatus::Stitched {
            width,
            height,
            images_used,
            ..
        } => {
            assert_eq!((*width, *height), (40, 30));
            assert_eq!(*images_used, 3);
        }
        other => panic!("unexpected status {:?}", other),
    }

    let north = image::open(test_dirs.target_dir.join("north_store.jpg"))?.into_rgb8();
    // Index 1 (blue, 5 wide) sits first; below the 10px-high second image is white.
    let first = north.get_pixel(2, 25);
    assert!(first[2] > 200 && first[0] < 60, "expected blue, got {:?}", first);
    let gap = north.get_pixel(12, 25);
    assert!(gap.0.iter().all(|c| *c > 230), "expected white gap, got {:?}", gap);

    assert_eq!(
        image::image_dimensions(test_dirs.target_dir.join("south.jpg"))?,
        (8, 8)
    );
    Ok(())
}

#[tokio::test]
async fn test_decode_failure_keeps_surviving_member() -> Result<()> {
    let test_dirs = setup_test_dirs("decode_failure").await;
    create_image(&test_dirs.source_dir.join("shop_1.png"), 12, 9, RED).await?;
    create_corrupt_image(&test_dirs.source_dir.join("shop_2.png")).await?;

    let config = config_for(&test_dirs.source_dir, &test_dirs.target_dir)?;
    let report = config.stitch_from_source().await?;

    let group = report.get("shop").unwrap();
    match &group.status {
        GroupStatus::Stitched {
            width,
            height,
            images_used,
            ..
        } => {
            assert_eq!((*width, *height), (12, 9));
            assert_eq!(*images_used, 1);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(group.decode_failures.len(), 1);
    assert_eq!(
        group.decode_failures[0].path,
        test_dirs.source_dir.join("shop_2.png")
    );
    assert_eq!(
        image::image_dimensions(test_dirs.target_dir.join("shop.jpg"))?,
        (12, 9)
    );
    Ok(())
}

#[tokio::test]
async fn test_group_without_usable_images_does_not_stop_others() -> Result<()> {
    let test_dirs = setup_test_dirs("isolated_failure").await;
    create_corrupt_image(&test_dirs.source_dir.join("broken_1.jpg")).await?;
    create_corrupt_image(&test_dirs.source_dir.join("broken_2.jpg")).await?;
    create_image(&test_dirs.source_dir.join("fine_1.png"), 3, 3, RED).await?;

    let config = config_for(&test_dirs.source_dir, &test_dirs.target_dir)?;
    let report = config.stitch_from_source().await?;

    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    let broken = report.get("broken").unwrap();
    assert_eq!(broken.status, GroupStatus::NoUsableImages);
    assert_eq!(broken.decode_failures.len(), 2);
    assert_eq!(list_file_names(&test_dirs.target_dir).await, vec!["fine.jpg"]);
    Ok(())
}

#[tokio::test]
async fn test_no_conforming_files_is_a_noop() -> Result<()> {
    let test_dirs = setup_test_dirs("noop").await;
    create_image(&test_dirs.source_dir.join("cover.png"), 3, 3, RED).await?;
    tokio::fs::write(test_dirs.source_dir.join("readme_1.txt"), b"hello").await?;

    let config = config_for(&test_dirs.source_dir, &test_dirs.target_dir)?;
    let report = config.stitch_from_source().await?;

    assert!(report.is_noop());
    assert_eq!(report.succeeded(), 0);
    assert!(!test_dirs.target_dir.exists());
    assert_eq!(report.collection.unwrap().scanned_entries, 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_source_directory_is_fatal() -> Result<()> {
    let test_dirs = setup_test_dirs("missing_source").await;
    let config = config_for(&test_dirs.source_dir.join("absent"), &test_dirs.target_dir)?;

    assert!(config.stitch_from_source().await.is_err());
    assert!(!test_dirs.target_dir.exists());
    Ok(())
}

#[tokio::test]
async fn test_existing_output_is_overwritten() -> Result<()> {
    let test_dirs = setup_test_dirs("overwrite").await;
    create_image(&test_dirs.source_dir.join("shop_1.png"), 6, 4, RED).await?;
    tokio::fs::create_dir_all(&test_dirs.target_dir).await?;
    tokio::fs::write(test_dirs.target_dir.join("shop.jpg"), b"stale").await?;

    let config = config_for(&test_dirs.source_dir, &test_dirs.target_dir)?;
    let report = config.stitch_from_source().await?;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(
        image::image_dimensions(test_dirs.target_dir.join("shop.jpg"))?,
        (6, 4)
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_output_directory_without_creation_fails_per_group() -> Result<()> {
    let test_dirs = setup_test_dirs("no_create_output").await;
    create_image(&test_dirs.source_dir.join("a_1.png"), 2, 2, RED).await?;
    create_image(&test_dirs.source_dir.join("b_1.png"), 2, 2, RED).await?;

    let config = TsunagiConfig::builder()
        .source_path(test_dirs.source_dir.clone())
        .target_path(test_dirs.target_dir.clone())
        .create_output_directory(false)
        .build()?;
    let report = config.stitch_from_source().await?;

    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.succeeded(), 0);
    for group in &report.groups {
        assert!(
            matches!(group.status, GroupStatus::WriteFailed { .. }),
            "unexpected status {:?}",
            group.status
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_stitch_from_collected_data_keeps_caller_order() -> Result<()> {
    let test_dirs = setup_test_dirs("collected_data").await;
    let wide = test_dirs.source_dir.join("wide.png");
    let narrow = test_dirs.source_dir.join("narrow.png");
    create_image(&wide, 20, 5, RED).await?;
    create_image(&narrow, 4, 5, BLUE).await?;

    let config = TsunagiConfig::builder()
        .target_path(test_dirs.target_dir.clone())
        .build()?;
    let groups = vec![
        Group::from_ordered_paths("pair", vec![narrow.clone(), wide.clone()]),
        Group::from_ordered_paths("empty", Vec::new()),
    ];
    let report = config.stitch_from_collected_data(groups).await?;

    assert!(report.collection.is_none());
    assert_eq!(report.get("empty").unwrap().status, GroupStatus::NoUsableImages);
    let pair = image::open(test_dirs.target_dir.join("pair.jpg"))?.into_rgb8();
    assert_eq!(pair.dimensions(), (24, 5));
    let first = pair.get_pixel(1, 2);
    assert!(first[2] > 200, "narrow blue image should come first: {:?}", first);
    Ok(())
}

#[tokio::test]
async fn test_compile_document_titles_pages_in_name_order() -> Result<()> {
    let test_dirs = setup_test_dirs("document").await;
    create_image(&test_dirs.source_dir.join("b_shop.jpg"), 8, 6, RED).await?;
    create_image(&test_dirs.source_dir.join("a_shop.png"), 5, 5, BLUE).await?;
    create_corrupt_image(&test_dirs.source_dir.join("c_broken.jpg")).await?;
    create_image(&test_dirs.source_dir.join("d_shop.bmp"), 4, 4, RED).await?;
    tokio::fs::write(test_dirs.source_dir.join("notes.txt"), b"skip me").await?;

    let config = TsunagiConfig::builder()
        .target_path(test_dirs.target_dir.clone())
        .metadata(DocumentMetadata {
            title: "Filter: Report".to_string(),
            authors: vec!["Inspector".to_string()],
            language: "zh".to_string(),
            ..Default::default()
        })
        .build()?;
    let report = timeout(TEST_TIMEOUT, config.compile_document(&test_dirs.source_dir))
        .await
        .expect("Test timed out")?;

    assert_eq!(report.pages, vec!["1. a_shop", "2. b_shop", "4. d_shop"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].path,
        test_dirs.source_dir.join("c_broken.jpg")
    );

    let output_path = report.output_path.expect("document written");
    assert_eq!(output_path, test_dirs.target_dir.join("Filter- Report.epub"));
    assert_valid_zip_file(&output_path);

    let entries = zip_entry_names(&output_path);
    let first_page = entries
        .iter()
        .find(|n| n.ends_with("page_001.xhtml"))
        .expect("first page present");
    assert!(entries.iter().any(|n| n.ends_with("images/page_003.jpg")));
    assert!(!entries.iter().any(|n| n.ends_with("page_004.xhtml")));
    let xhtml = read_zip_entry(&output_path, first_page);
    assert!(xhtml.contains("1. a_shop"));
    Ok(())
}

#[tokio::test]
async fn test_compile_document_without_images_writes_nothing() -> Result<()> {
    let test_dirs = setup_test_dirs("document_empty").await;
    tokio::fs::write(test_dirs.source_dir.join("notes.txt"), b"skip me").await?;

    let config = TsunagiConfig::builder()
        .target_path(test_dirs.target_dir.clone())
        .metadata(DocumentMetadata::default_with_title("Empty".to_string()))
        .build()?;
    let report = config.compile_document(&test_dirs.source_dir).await?;

    assert!(report.output_path.is_none());
    assert!(report.pages.is_empty());
    assert!(!test_dirs.target_dir.exists());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_keys_keep_characters_legal_in_file_names() -> Result<()> {
    let test_dirs = setup_test_dirs("key_characters").await;
    create_image(&test_dirs.source_dir.join("a:b_1.png"), 10, 10, RED).await?;
    create_image(&test_dirs.source_dir.join("a-b_1.png"), 30, 10, BLUE).await?;

    let config = config_for(&test_dirs.source_dir, &test_dirs.target_dir)?;
    let report = config.stitch_from_source().await?;

    assert_eq!(report.succeeded(), 2);
    assert_eq!(
        list_file_names(&test_dirs.target_dir).await,
        vec!["a-b.jpg", "a:b.jpg"]
    );
    assert_eq!(
        image::image_dimensions(test_dirs.target_dir.join("a:b.jpg"))?,
        (10, 10)
    );
    assert_eq!(
        image::image_dimensions(test_dirs.target_dir.join("a-b.jpg"))?,
        (30, 10)
    );
    Ok(())
}

#[tokio::test]
async fn test_colliding_output_names_do_not_overwrite() -> Result<()> {
    let test_dirs = setup_test_dirs("output_collision").await;
    let first = test_dirs.source_dir.join("first.png");
    let second = test_dirs.source_dir.join("second.png");
    create_image(&first, 20, 4, RED).await?;
    create_image(&second, 6, 4, BLUE).await?;

    let config = TsunagiConfig::builder()
        .target_path(test_dirs.target_dir.clone())
        .build()?;
    let groups = vec![
        Group::from_ordered_paths("floor/east", vec![first]),
        Group::from_ordered_paths("floor_east", vec![second]),
    ];
    let report = config.stitch_from_collected_data(groups).await?;

    let output_path = test_dirs.target_dir.join("floor_east.jpg");
    assert_eq!(report.succeeded(), 1);
    assert!(report.get("floor/east").unwrap().is_success());
    match &report.get("floor_east").unwrap().status {
        GroupStatus::WriteFailed {
            output_path: clashing,
            reason,
        } => {
            assert_eq!(clashing, &output_path);
            assert!(reason.contains("floor/east"), "reason was {}", reason);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(image::image_dimensions(&output_path)?, (20, 4));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_source_directory_with_question_mark_is_accepted() -> Result<()> {
    let test_dirs = setup_test_dirs("question_mark_source").await;
    let source = test_dirs.base_dir.join("photos?2024");
    create_image(&source.join("s_1.png"), 4, 4, RED).await?;

    let config = config_for(&source, &test_dirs.target_dir)?;
    let report = config.stitch_from_source().await?;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(list_file_names(&test_dirs.target_dir).await, vec!["s.jpg"]);
    Ok(())
}

#[tokio::test]
async fn test_blocked_output_fails_only_its_group() -> Result<()> {
    let test_dirs = setup_test_dirs("blocked_output").await;
    create_image(&test_dirs.source_dir.join("blocked_1.png"), 3, 3, RED).await?;
    create_image(&test_dirs.source_dir.join("open_1.png"), 5, 3, BLUE).await?;
    // A directory where the composite should go makes that one write fail.
    tokio::fs::create_dir_all(test_dirs.target_dir.join("blocked.jpg")).await?;

    let config = config_for(&test_dirs.source_dir, &test_dirs.target_dir)?;
    let report = config.stitch_from_source().await?;

    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.succeeded(), 1);
    assert!(matches!(
        report.get("blocked").unwrap().status,
        GroupStatus::WriteFailed { .. }
    ));
    assert!(report.get("open").unwrap().is_success());
    assert!(test_dirs.target_dir.join("blocked.jpg").is_dir());
    assert_eq!(
        image::image_dimensions(test_dirs.target_dir.join("open.jpg"))?,
        (5, 3)
    );
    Ok(())
}

#[tokio::test]
async fn test_compile_document_respects_output_directory_creation_flag() -> Result<()> {
    let test_dirs = setup_test_dirs("document_no_create").await;
    create_image(&test_dirs.source_dir.join("a.png"), 4, 4, RED).await?;

    let config = TsunagiConfig::builder()
        .target_path(test_dirs.target_dir.clone())
        .create_output_directory(false)
        .metadata(DocumentMetadata::default_with_title("Inspections".to_string()))
        .build()?;
    let result = config.compile_document(&test_dirs.source_dir).await;

    assert!(matches!(result, Err(tsunagi::error::Error::NotFound(_))));
    assert!(!test_dirs.target_dir.exists());
    Ok(())
}
