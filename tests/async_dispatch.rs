//! Non-blocking dispatch: concurrent operations resolve to their own
//! inputs, and async results match their blocking counterparts exactly.

mod common;

use common::{gradient, mock_codec, noise};
use futures::executor::block_on;
use futures::future::join_all;
use jxlx::{CodecConfig, EncodeOptions, Error};

#[test]
fn test_concurrent_encodes_resolve_to_their_own_inputs() {
    let (codec, _) = mock_codec(CodecConfig::new().lossless(true).threads(4));
    let images: Vec<_> = (0..16).map(|i| noise(12, 12, 3, i as u32 + 1)).collect();
    let options = EncodeOptions::new();

    let streams = block_on(async {
        let futures: Vec<_> = images
            .iter()
            .map(|image| codec.encode_async(image, &options))
            .collect();
        join_all(futures).await
    });

    // Whatever order the pool finished in, each future must carry its
    // own call's result.
    for (image, stream) in images.iter().zip(streams) {
        let stream = stream.expect("encode should succeed");
        let back = codec.decode(&stream).expect("decode should succeed");
        assert_eq!(&back, image);
    }
}

#[test]
fn test_async_results_match_sync_results() {
    let (codec, _) = mock_codec(CodecConfig::new().threads(2));
    let image = gradient(10, 8, 3);
    let options = EncodeOptions::new().effort(3).exif(b"meta".to_vec());

    let sync = codec.encode(&image, &options).expect("sync encode");
    let (via_async, decoded, jpeg_sync, jpeg_async) = block_on(async {
        let via_async = codec.encode_async(&image, &options).await.expect("async encode");
        let decoded = codec.decode_async(&via_async).await.expect("async decode");
        let jpeg_sync = codec.encode_jpeg(&image, 80).expect("sync encode_jpeg");
        let jpeg_async = codec
            .encode_jpeg_async(&image, 80)
            .await
            .expect("async encode_jpeg");
        (via_async, decoded, jpeg_sync, jpeg_async)
    });

    assert_eq!(via_async, sync);
    assert_eq!(decoded.shape(), image.shape());
    assert_eq!(jpeg_async, jpeg_sync);
}

#[test]
fn test_async_metadata_roundtrip() {
    let (codec, _) = mock_codec(CodecConfig::new().threads(2));
    let image = gradient(6, 6, 3);

    block_on(async {
        let jxl = codec
            .encode_async(&image, &EncodeOptions::new().xmp(b"<xmp/>".to_vec()))
            .await
            .expect("encode");
        let (_, meta) = codec
            .decode_with_metadata_async(&jxl)
            .await
            .expect("decode with metadata");
        assert_eq!(meta.xmp.as_deref(), Some(b"<xmp/>".as_slice()));
        assert_eq!(meta.exif, None);
    });
}

#[test]
fn test_async_transcode_roundtrip_is_bit_exact() {
    let (codec, _) = mock_codec(CodecConfig::new().threads(2));
    let image = gradient(9, 9, 3);

    block_on(async {
        let jpeg = codec.encode_jpeg_async(&image, 90).await.expect("encode_jpeg");
        let jxl = codec.jpeg_to_jxl_async(&jpeg, None).await.expect("jpeg_to_jxl");
        let back = codec.jxl_to_jpeg_async(&jxl).await.expect("jxl_to_jpeg");
        assert_eq!(back, jpeg);
    });
}

#[test]
fn test_async_errors_match_sync_errors() {
    let (codec, _) = mock_codec(CodecConfig::new().threads(2));

    let sync_err = codec.decode(b"garbage").unwrap_err();
    let async_err = block_on(codec.decode_async(b"garbage")).unwrap_err();
    assert!(matches!(sync_err, Error::CorruptStream(_)));
    assert!(matches!(async_err, Error::CorruptStream(_)));

    let image = gradient(4, 4, 3);
    let jxl = codec.encode(&image, &EncodeOptions::new()).expect("encode");
    let async_err = block_on(codec.jxl_to_jpeg_async(&jxl)).unwrap_err();
    assert!(matches!(async_err, Error::NotReconstructible));
}

#[test]
fn test_single_thread_pool_serializes_but_completes_everything() {
    let (codec, engine) = mock_codec(CodecConfig::new().threads(1));
    let images: Vec<_> = (0..8).map(|i| noise(8, 8, 3, 100 + i as u32)).collect();
    let options = EncodeOptions::new();

    let results = block_on(async {
        let futures: Vec<_> = images
            .iter()
            .map(|image| codec.encode_async(image, &options))
            .collect();
        join_all(futures).await
    });

    assert_eq!(results.len(), 8);
    for result in results {
        result.expect("every dispatched encode should complete");
    }
    assert_eq!(engine.calls(), 8);
}
