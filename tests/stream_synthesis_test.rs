//! End-to-end streaming tests against an in-process fake synthesis service.

mod common;

use common::{read_wav, spawn_tts, test_config, FakeTts, StaticTokenProvider};

use vocalis::proto::v1::AudioEncoding;
use vocalis::{synthesize_to_file, AssemblyError, ClientError, StreamFailure};

#[tokio::test]
async fn test_full_pipeline_writes_wav() {
    let fake = FakeTts::new("r1", "t1", vec![b"AAAA".to_vec(), b"BB".to_vec()]);
    let calls = fake.calls();
    let addr = spawn_tts(fake).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("hello.wav");
    let config = test_config(addr, out.clone());

    let outcome = synthesize_to_file(&config, &StaticTokenProvider("test-token"), "hello")
        .await
        .unwrap();

    // Correlation ids captured from the initial response metadata.
    assert_eq!(outcome.response_metadata.request_id.as_deref(), Some("r1"));
    assert_eq!(outcome.response_metadata.trace_id.as_deref(), Some("t1"));
    assert_eq!(outcome.file.chunks, 2);
    assert_eq!(outcome.file.payload_bytes, 6);

    // Container: mono, 22050 Hz, 16-bit, payload is the exact concatenation.
    let (spec, payload) = read_wav(&out);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 22_050);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(payload, b"AAAABB");

    // The service saw the fixed request fields plus the caller's text, and
    // the metadata this client generated.
    let calls = calls.lock().await;
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.request.text, "hello");
    assert_eq!(call.request.sample_rate_hertz, 22_050);
    assert_eq!(call.request.encoding, AudioEncoding::LinearPcm as i32);
    assert_eq!(call.request.voice_name, "gandzhaev");

    let auth = call.metadata.get("authorization").unwrap().to_str().unwrap();
    assert_eq!(auth, "Bearer test-token");
    let trace = call
        .metadata
        .get("external_trace_id")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(trace, outcome.trace_id.as_str());
}

#[tokio::test]
async fn test_server_error_after_one_chunk_leaves_no_file() {
    let fake =
        FakeTts::new("r1", "t1", vec![b"AAAA".to_vec(), b"BB".to_vec()]).failing_after(1);
    let addr = spawn_tts(fake).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("broken.wav");
    let config = test_config(addr, out.clone());

    let result = synthesize_to_file(&config, &StaticTokenProvider("test-token"), "hello").await;

    match result {
        Err(ClientError::Assembly(AssemblyError::Stream(failure))) => {
            // The failure carries the metadata captured before the stream broke.
            let metadata = failure.response_metadata().unwrap();
            assert_eq!(metadata.request_id.as_deref(), Some("r1"));
            assert!(matches!(failure, StreamFailure::Status { .. }));
        }
        other => panic!("expected mid-stream failure, got {other:?}"),
    }

    assert!(!out.exists());
    assert!(!dir.path().join("broken.wav.part").exists());
}

#[tokio::test]
async fn test_zero_chunk_stream_yields_valid_empty_container() {
    let fake = FakeTts::new("r2", "t2", vec![]);
    let addr = spawn_tts(fake).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("silence.wav");
    let config = test_config(addr, out.clone());

    let outcome = synthesize_to_file(&config, &StaticTokenProvider("test-token"), "hello")
        .await
        .unwrap();

    assert_eq!(outcome.file.chunks, 0);
    let (spec, payload) = read_wav(&out);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 22_050);
    assert_eq!(spec.bits_per_sample, 16);
    assert!(payload.is_empty());
}

#[tokio::test]
async fn test_chunks_larger_than_default_message_limit() {
    // A single chunk past the default 4 MB decode cap; the session lifts
    // the cap in both directions.
    let big = vec![0x5Au8; 8 * 1024 * 1024];
    let fake = FakeTts::new("r3", "t3", vec![big.clone()]);
    let addr = spawn_tts(fake).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("big.wav");
    let config = test_config(addr, out.clone());

    let outcome = synthesize_to_file(&config, &StaticTokenProvider("test-token"), "hello")
        .await
        .unwrap();

    assert_eq!(outcome.file.payload_bytes, big.len() as u64);
    let (_, payload) = read_wav(&out);
    assert_eq!(payload.len(), big.len());
}

#[tokio::test]
async fn test_each_invocation_gets_a_fresh_trace_id() {
    let fake = FakeTts::new("r4", "t4", vec![b"AB".to_vec()]);
    let calls = fake.calls();
    let addr = spawn_tts(fake).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path().join("a.wav"));
    let first = synthesize_to_file(&config, &StaticTokenProvider("test-token"), "one")
        .await
        .unwrap();

    let mut config = config;
    config.output_path = dir.path().join("b.wav");
    let second = synthesize_to_file(&config, &StaticTokenProvider("test-token"), "two")
        .await
        .unwrap();

    assert_ne!(first.trace_id, second.trace_id);

    let calls = calls.lock().await;
    assert_eq!(calls.len(), 2);
    let sent: Vec<&str> = calls
        .iter()
        .map(|c| c.metadata.get("external_trace_id").unwrap().to_str().unwrap())
        .collect();
    assert_eq!(sent[0], first.trace_id.as_str());
    assert_eq!(sent[1], second.trace_id.as_str());
}
