//! Integration test for stage chains in both directions.

use tessera_stream::{
    Base64Decode, Base64Encode, BlockPolicy, BufferSource, Cipher, Crc32, DecodePolicy,
    IoSink, IoSource, Lz4Compress, Lz4Decompress, RandomSource, Sha1, Sink, Source, StreamError,
    TransformSink, TransformSource,
};

const KEY: &[u8] = b"allied command key";

fn encode_base64(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut stage = TransformSink::new(Base64Encode::new(), &mut out);
    stage.put(data).unwrap();
    stage.flush().unwrap();
    out
}

fn decode_base64(text: &[u8], policy: DecodePolicy) -> Result<Vec<u8>, StreamError> {
    let mut stage = TransformSource::new(Base64Decode::new(policy), BufferSource::new(text));
    let mut out = Vec::new();
    stage.read_to_end(&mut out)?;
    Ok(out)
}

#[test]
fn test_base64_abcde() {
    let text = encode_base64(b"ABCDE");
    assert_eq!(text, b"QUJDREU=");
    assert_eq!(decode_base64(&text, DecodePolicy::Strict).unwrap(), b"ABCDE");
    assert_eq!(decode_base64(&text, DecodePolicy::Lenient).unwrap(), b"ABCDE");
}

#[test]
fn test_base64_every_length() {
    let mut random = RandomSource::from_seed(3);
    for len in 0..=40 {
        let data = random.bytes(len);
        let text = encode_base64(&data);
        assert_eq!(text.len(), len.div_ceil(3) * 4);
        assert_eq!(decode_base64(&text, DecodePolicy::Strict).unwrap(), data, "length {len}");
    }
}

#[test]
fn test_cipher_roundtrip_through_chains() {
    let plain = RandomSource::from_seed(11).bytes(4096);

    let mut sealed = Vec::new();
    let mut sink = TransformSink::new(Cipher::encrypt(KEY, BlockPolicy::Reject).unwrap(), &mut sealed);
    for chunk in plain.chunks(100) {
        sink.put(chunk).unwrap();
    }
    sink.flush().unwrap();
    assert_eq!(sealed.len(), plain.len());

    let mut source = TransformSource::new(
        Cipher::decrypt(KEY, BlockPolicy::Reject).unwrap(),
        BufferSource::new(&sealed),
    );
    let mut opened = Vec::new();
    source.read_to_end(&mut opened).unwrap();
    assert_eq!(opened, plain);
}

#[test]
fn test_hash_chunking_invariance() {
    let data = RandomSource::from_seed(5).bytes(1000);

    let mut whole = TransformSink::new(Sha1::new(), TransformSink::new(Crc32::new(), Vec::new()));
    whole.put(&data).unwrap();

    let mut pieces = TransformSink::new(Sha1::new(), TransformSink::new(Crc32::new(), Vec::new()));
    for chunk in data.chunks(7) {
        pieces.put(chunk).unwrap();
    }

    assert_eq!(whole.transform().digest(), pieces.transform().digest());
    assert_eq!(
        whole.get_ref().transform().checksum(),
        pieces.get_ref().transform().checksum()
    );
    assert_eq!(whole.get_ref().transform().checksum(), crc32fast::hash(&data));
}

#[test]
fn test_hash_cipher_base64_chain() {
    let payload = RandomSource::from_seed(9).bytes(777);

    // hash -> cipher -> base64 -> text
    let mut text = Vec::new();
    let mut chain = TransformSink::new(
        Sha1::new(),
        TransformSink::new(
            Cipher::encrypt(KEY, BlockPolicy::PassThrough).unwrap(),
            TransformSink::new(Base64Encode::new(), &mut text),
        ),
    );
    for chunk in payload.chunks(64) {
        chain.put(chunk).unwrap();
    }
    chain.flush().unwrap();
    let sent_digest = chain.transform().digest();
    assert!(text.iter().all(u8::is_ascii));

    // text -> base64 -> cipher -> hash
    let mut chain = TransformSource::new(
        Sha1::new(),
        TransformSource::new(
            Cipher::decrypt(KEY, BlockPolicy::PassThrough).unwrap(),
            TransformSource::new(
                Base64Decode::new(DecodePolicy::Strict),
                BufferSource::new(&text),
            ),
        ),
    );
    let mut received = Vec::new();
    let mut buf = [0u8; 50];
    loop {
        let read = chain.get(&mut buf).unwrap();
        received.extend_from_slice(&buf[..read]);
        if read < buf.len() {
            break;
        }
    }

    assert_eq!(received, payload);
    assert_eq!(chain.transform().digest(), sent_digest);
}

#[test]
fn test_compressed_file_roundtrip() {
    let mut data = RandomSource::from_seed(1).bytes(10_000);
    data.extend(std::iter::repeat(0xAB).take(60_000));

    let mut sink = TransformSink::new(
        Lz4Compress::with_block_size(4096),
        IoSink::new(std::io::Cursor::new(Vec::new())),
    );
    sink.put(&data).unwrap();
    sink.flush().unwrap();
    let (_, sink) = sink.into_parts();
    let packed = sink.into_inner().into_inner();
    assert!(packed.len() < data.len() / 2);

    let mut source = TransformSource::new(
        Lz4Decompress::new(),
        IoSource::new(std::io::Cursor::new(packed)),
    );
    let mut out = Vec::new();
    source.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_boxed_chain_assembly() {
    let mut out = Vec::new();
    let mut tail: Box<dyn Sink + '_> = Box::new(&mut out);
    for _ in 0..2 {
        tail = Box::new(TransformSink::new(Base64Encode::new(), tail));
    }
    tail.put(b"ABCDE").unwrap();
    tail.flush().unwrap();
    drop(tail);

    let once = decode_base64(&out, DecodePolicy::Strict).unwrap();
    assert_eq!(decode_base64(&once, DecodePolicy::Strict).unwrap(), b"ABCDE");
}

#[test]
fn test_flush_is_single_use() {
    let mut chain = TransformSink::new(Crc32::new(), TransformSink::new(Base64Encode::new(), Vec::new()));
    chain.put(b"x").unwrap();
    chain.flush().unwrap();
    assert!(matches!(chain.flush(), Err(StreamError::AlreadyFlushed)));
}

#[test]
fn test_partial_block_policy_is_applied_at_end_of_pull() {
    let sealed = b"123456789";
    let mut source = TransformSource::new(
        Cipher::decrypt(KEY, BlockPolicy::Reject).unwrap(),
        BufferSource::new(sealed),
    );
    let mut out = Vec::new();
    assert!(matches!(
        source.read_to_end(&mut out),
        Err(StreamError::PartialBlock { len: 1, block: 8 })
    ));
}
