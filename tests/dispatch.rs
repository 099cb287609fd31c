use mockall::Sequence;
use photo_bundle::batch::RawPhoto;
use photo_bundle::config::BundleOptions;
use photo_bundle::dispatch::dispatch;
use photo_bundle::local::LocalStore;
use photo_bundle::transport::{Delivery, MockTransport, SendContext, TransportError};
use tempfile::tempdir;

fn photo(name: &str, size: usize) -> RawPhoto {
    RawPhoto::new(Some(name.to_string()), vec![7u8; size])
}

fn small_batches_opts() -> BundleOptions {
    BundleOptions {
        batch_size_ceiling: 25,
        ..BundleOptions::default()
    }
}

fn ok_delivery(name: &str) -> Result<Delivery, TransportError> {
    Ok(Delivery {
        location: format!("sent {name}"),
    })
}

#[tokio::test]
async fn dispatch_sends_one_bundle_per_batch_with_part_numbers() {
    // Three 10-byte photos against a 25-byte ceiling: two batches.
    let photos = vec![photo("a.jpg", 10), photo("b.jpg", 10), photo("c.jpg", 10)];

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(2)
        .withf(|_, name, ctx| name.starts_with("fotos_NS-EQ-1_parte") && ctx.identifier == "EQ-1")
        .returning(|_, name, _| ok_delivery(name));

    let report = dispatch(&small_batches_opts(), "EQ-1", photos, &transport, None)
        .await
        .unwrap();

    assert_eq!(report.identifier, "EQ-1");
    assert_eq!(report.bundles.len(), 2);
    assert_eq!(report.bundles[0].archive_name, "fotos_NS-EQ-1_parte01.zip");
    assert_eq!(report.bundles[1].archive_name, "fotos_NS-EQ-1_parte02.zip");
    assert_eq!(report.bundles[0].entries.len(), 2);
    assert_eq!(report.bundles[1].entries.len(), 1);
    assert_eq!(report.bundles[0].delivery, "sent fotos_NS-EQ-1_parte01.zip");
}

#[tokio::test]
async fn single_batch_archives_carry_no_part_suffix() {
    let photos = vec![photo("a.jpg", 5)];

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(1)
        .withf(|_, name, _| name == "fotos_NS-EQ-1.zip")
        .returning(|_, name, _| ok_delivery(name));

    let report = dispatch(&small_batches_opts(), "EQ-1", photos, &transport, None)
        .await
        .unwrap();
    assert_eq!(report.bundles.len(), 1);
}

#[tokio::test]
async fn dispatch_stops_at_the_first_failed_batch() {
    // Three batches; the second delivery fails, the third is never attempted.
    let photos = vec![photo("a.jpg", 20), photo("b.jpg", 20), photo("c.jpg", 20)];

    let mut seq = Sequence::new();
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, name, _| ok_delivery(name));
    transport
        .expect_send()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| {
            Err(TransportError::Remote {
                status: 500,
                body: "backend exploded".to_string(),
            })
        });

    let err = dispatch(&small_batches_opts(), "EQ-1", photos, &transport, None)
        .await
        .unwrap_err();
    assert!(err.contains("Delivery failed"), "got: {err}");
    assert!(err.contains("backend exploded"), "remote body must survive verbatim: {err}");
}

#[tokio::test]
async fn dispatch_validates_before_any_send() {
    let mut transport = MockTransport::new();
    transport.expect_send().times(0);

    let err = dispatch(
        &BundleOptions::default(),
        "  ",
        vec![photo("a.jpg", 1)],
        &transport,
        None,
    )
    .await
    .unwrap_err();
    assert!(err.contains("identifier"));

    let err = dispatch(&BundleOptions::default(), "EQ-1", Vec::new(), &transport, None)
        .await
        .unwrap_err();
    assert!(err.contains("no photos"));
}

#[tokio::test]
async fn remote_sends_can_keep_a_local_copy() {
    let tmp = tempdir().unwrap();
    let store = LocalStore::new(tmp.path());
    let photos = vec![photo("a.jpg", 5)];

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(1)
        .returning(|_, name, _| ok_delivery(name));

    let report = dispatch(
        &BundleOptions::default(),
        "EQ-7",
        photos,
        &transport,
        Some(&store),
    )
    .await
    .unwrap();

    let copy = store.identifier_dir("EQ-7").join(&report.bundles[0].archive_name);
    assert!(copy.is_file(), "local copy missing at {}", copy.display());
}

#[tokio::test]
async fn send_context_carries_the_configured_caption() {
    let photos = vec![photo("a.jpg", 5)];
    let opts = BundleOptions {
        caption: Some("Inspecao agosto".to_string()),
        ..BundleOptions::default()
    };

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(1)
        .withf(|_, _, ctx: &SendContext| ctx.caption.as_deref() == Some("Inspecao agosto"))
        .returning(|_, name, _| ok_delivery(name));

    dispatch(&opts, "EQ-1", photos, &transport, None).await.unwrap();
}
