//! Byte-exact parser tests for the individual chunk grammars

use bw64::chunk::format::{KSDATAFORMAT_SUBTYPE_PCM, WAVE_FORMAT_EXTENSIBLE};
use bw64::chunk::{AudioId, ChnaChunk, CueChunk, CuePoint, DataSize64Chunk, FormatInfoChunk, LabelChunk};
use bw64::parser::{
    parse_chna_chunk, parse_cue_chunk, parse_data_size64_chunk, parse_format_info_chunk,
    parse_label_chunk, parse_list_chunk,
};
use bw64::{ids, Error, FourCC};
use std::collections::BTreeMap;
use std::io::Cursor;

#[test]
fn format_info_chunk_basic() {
    let bytes: &[u8] = b"\x01\x00\x01\x00\
        \x80\xbb\x00\x00\
        \x00\x77\x01\x00\
        \x02\x00\x10\x00";
    let mut stream = Cursor::new(bytes);
    let chunk = parse_format_info_chunk(&mut stream, ids::FMT, 16).unwrap();
    assert_eq!(chunk.format_tag(), 1);
    assert_eq!(chunk.channel_count(), 1);
    assert_eq!(chunk.sample_rate(), 48000);
    assert_eq!(chunk.bytes_per_second(), 96000);
    assert_eq!(chunk.block_alignment(), 2);
    assert_eq!(chunk.bits_per_sample(), 16);
    assert!(!chunk.is_extensible());
    assert!(chunk.extra_data().is_none());
}

#[test]
fn format_info_chunk_wrong_size() {
    let bytes: &[u8] = b"\x01\x00\x01\x00\
        \x80\xbb\x00\x00\
        \x00\x77\x01\x00\
        \x02\x00\x10\x00\
        \x00\x00\x00\x00";
    let mut stream = Cursor::new(bytes);
    assert!(parse_format_info_chunk(&mut stream, ids::FMT, 20).is_err());
}

#[test]
fn format_info_chunk_illegal_format_tag() {
    let bytes: &[u8] = b"\x02\x00\x01\x00\
        \x80\xbb\x00\x00\
        \x00\x77\x01\x00\
        \x02\x00\x10\x00";
    let mut stream = Cursor::new(bytes);
    let err = parse_format_info_chunk(&mut stream, ids::FMT, 16).unwrap_err();
    assert!(matches!(err, Error::Format(_)), "got {:?}", err);
}

#[test]
fn format_info_chunk_zero_channel_count() {
    let bytes: &[u8] = b"\x01\x00\x00\x00\
        \x80\xbb\x00\x00\
        \x00\x77\x01\x00\
        \x02\x00\x10\x00";
    let mut stream = Cursor::new(bytes);
    let err = parse_format_info_chunk(&mut stream, ids::FMT, 16).unwrap_err();
    assert!(matches!(err, Error::Format(_)), "got {:?}", err);
}

#[test]
fn format_info_chunk_zero_sample_rate() {
    let bytes: &[u8] = b"\x01\x00\x01\x00\
        \x00\x00\x00\x00\
        \x00\x77\x01\x00\
        \x02\x00\x10\x00";
    let mut stream = Cursor::new(bytes);
    assert!(parse_format_info_chunk(&mut stream, ids::FMT, 16).is_err());
}

#[test]
fn format_info_chunk_wrong_bytes_per_second() {
    let bytes: &[u8] = b"\x01\x00\x01\x00\
        \x80\xbb\x00\x00\
        \x01\x77\x01\x00\
        \x02\x00\x10\x00";
    let mut stream = Cursor::new(bytes);
    let err = parse_format_info_chunk(&mut stream, ids::FMT, 16).unwrap_err();
    assert!(matches!(err, Error::Format(_)), "got {:?}", err);
}

#[test]
fn format_info_chunk_wrong_block_alignment() {
    let bytes: &[u8] = b"\x01\x00\x01\x00\
        \x80\xbb\x00\x00\
        \x00\x77\x01\x00\
        \x00\x00\x10\x00";
    let mut stream = Cursor::new(bytes);
    let err = parse_format_info_chunk(&mut stream, ids::FMT, 16).unwrap_err();
    assert!(matches!(err, Error::Format(_)), "got {:?}", err);
}

#[test]
fn format_info_chunk_write_read() {
    let chunk = FormatInfoChunk::new(2, 48000, 24, None, 1).unwrap();
    let mut bytes = Vec::new();
    chunk.write(&mut bytes).unwrap();

    let mut stream = Cursor::new(bytes);
    let reread = parse_format_info_chunk(&mut stream, ids::FMT, 16).unwrap();
    assert_eq!(reread.channel_count(), 2);
    assert_eq!(reread.sample_rate(), 48000);
    assert_eq!(reread.bits_per_sample(), 24);
}

#[test]
fn format_info_chunk_construction_overflow() {
    let err = FormatInfoChunk::new(0xffff, 48000, 24, None, 1).unwrap_err();
    assert!(err
        .to_string()
        .contains("channel count and bits per sample would overflow block alignment"));

    let err = FormatInfoChunk::new(0x1000, 0xffff_ffff, 16, None, 1).unwrap_err();
    assert!(err
        .to_string()
        .contains("would overflow bytes per second"));
}

#[test]
fn format_info_chunk_cb_size_zero() {
    let bytes: &[u8] = b"\x01\x00\x01\x00\
        \x80\xbb\x00\x00\
        \x00\x77\x01\x00\
        \x02\x00\x10\x00\
        \x00\x00";
    let mut stream = Cursor::new(bytes);
    let chunk = parse_format_info_chunk(&mut stream, ids::FMT, 18).unwrap();
    assert_eq!(chunk.format_tag(), 1);
    assert_eq!(chunk.bits_per_sample(), 16);
    assert!(chunk.extra_data().is_none());
}

#[test]
fn format_info_chunk_cb_size_too_large() {
    let bytes: &[u8] = b"\x01\x00\x01\x00\
        \x80\xbb\x00\x00\
        \x00\x77\x01\x00\
        \x02\x00\x10\x00\
        \x16\x00";
    let mut stream = Cursor::new(bytes);
    assert!(parse_format_info_chunk(&mut stream, ids::FMT, 18).is_err());
}

const EXTENSIBLE_FMT: &[u8] = b"\xfe\xff\x01\x00\
    \x80\xbb\x00\x00\
    \x00\x77\x01\x00\
    \x02\x00\x10\x00\
    \x16\x00\
    \x10\x00\
    \x04\x00\x00\x00\
    \x01\x00\x00\x00\x00\x00\x10\x00\x80\x00\x00\xaa\x00\x38\x9b\x71";

#[test]
fn format_info_chunk_extensible() {
    let mut stream = Cursor::new(EXTENSIBLE_FMT);
    let chunk = parse_format_info_chunk(&mut stream, ids::FMT, 40).unwrap();
    assert_eq!(chunk.format_tag(), WAVE_FORMAT_EXTENSIBLE);
    assert!(chunk.is_extensible());
    let extra = chunk.extra_data().expect("extensible chunk must carry extra data");
    assert_eq!(extra.valid_bits_per_sample(), 16);
    assert_eq!(extra.channel_mask(), 4);
    assert_eq!(extra.sub_format().data1, 1);
    assert_eq!(*extra.sub_format(), KSDATAFORMAT_SUBTYPE_PCM);

    // serializing yields the original bytes
    let mut written = Vec::new();
    chunk.write(&mut written).unwrap();
    assert_eq!(written, EXTENSIBLE_FMT);
}

#[test]
fn format_info_chunk_pcm_with_extra_data() {
    // plain PCM must not carry the 22 extra bytes
    let mut bytes = EXTENSIBLE_FMT.to_vec();
    bytes[0] = 0x01;
    bytes[1] = 0x00;
    let mut stream = Cursor::new(bytes);
    assert!(parse_format_info_chunk(&mut stream, ids::FMT, 40).is_err());
}

const CHNA_SINGLE: &[u8] = b"\x01\x00\x01\x00\
    \x01\x00\
    \x41\x54\x55\x5f\x30\x30\x30\x30\x30\x30\x30\x31\
    \x41\x54\x5f\x30\x30\x30\x33\x31\x30\x30\x31\x5f\x30\x31\
    \x41\x50\x5f\x30\x30\x30\x33\x31\x30\x30\x31\
    \x00";

#[test]
fn chna_chunk_basic() {
    let mut stream = Cursor::new(CHNA_SINGLE);
    let chunk = parse_chna_chunk(&mut stream, ids::CHNA, 44).unwrap();
    assert_eq!(chunk.num_tracks(), 1);
    assert_eq!(chunk.num_uids(), 1);
    assert_eq!(chunk.audio_ids().len(), 1);
    assert_eq!(chunk.audio_ids()[0].track_index(), 1);
    assert_eq!(chunk.audio_ids()[0].uid(), "ATU_00000001");
    assert_eq!(chunk.audio_ids()[0].track_ref(), "AT_00031001_01");
    assert_eq!(chunk.audio_ids()[0].pack_ref(), "AP_00031001");
}

#[test]
fn chna_chunk_write_read() {
    let mut chunk = ChnaChunk::default();
    chunk.add_audio_id(AudioId::new(1, "ATU_00000001", "AT_00031001_01", "AP_00031001").unwrap());
    chunk.add_audio_id(AudioId::new(1, "ATU_00000002", "AT_00031002_01", "AP_00031002").unwrap());
    chunk.add_audio_id(AudioId::new(2, "ATU_00000003", "AT_00031003_01", "AP_00031003").unwrap());

    let mut bytes = Vec::new();
    chunk.write(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 124);

    let mut stream = Cursor::new(bytes);
    let reread = parse_chna_chunk(&mut stream, ids::CHNA, 124).unwrap();
    assert_eq!(reread.num_tracks(), 2);
    assert_eq!(reread.num_uids(), 3);
    assert_eq!(reread.audio_ids()[1].uid(), "ATU_00000002");
    assert_eq!(reread.audio_ids()[2].track_index(), 2);
    assert_eq!(reread.audio_ids()[2].pack_ref(), "AP_00031003");
}

#[test]
fn chna_chunk_wrong_id() {
    let mut stream = Cursor::new(&b"\x00\x00"[..]);
    assert!(parse_chna_chunk(&mut stream, FourCC::new(b"chni"), 2).is_err());
}

#[test]
fn chna_chunk_wrong_size() {
    let mut stream = Cursor::new(&b"\x00\x00"[..]);
    assert!(parse_chna_chunk(&mut stream, ids::CHNA, 2).is_err());
}

#[test]
fn chna_chunk_wrong_num_tracks() {
    let mut bytes = CHNA_SINGLE.to_vec();
    bytes[0] = 0x02; // claim two tracks, provide one
    let mut stream = Cursor::new(bytes);
    assert!(parse_chna_chunk(&mut stream, ids::CHNA, 44).is_err());
}

#[test]
fn chna_chunk_wrong_num_uids() {
    let mut bytes = CHNA_SINGLE.to_vec();
    bytes[2] = 0x02; // claim two uids, provide one
    let mut stream = Cursor::new(bytes);
    assert!(parse_chna_chunk(&mut stream, ids::CHNA, 44).is_err());
}

#[test]
fn ds64_chunk_basic() {
    let bytes: &[u8] = b"\x9a\xc6\x22\x31\xa5\x00\x00\x00\
        \xa4\x25\x87\xcc\x86\x00\x00\x00\
        \x00\x00\x00\x00\x00\x00\x00\x00\
        \x01\x00\x00\x00\
        \x61\x78\x6d\x6c\
        \x30\x5a\xc8\x00\x00\x00\x00\x00";
    let mut stream = Cursor::new(bytes);
    let chunk = parse_data_size64_chunk(&mut stream, ids::DS64, 40).unwrap();
    assert_eq!(chunk.bw64_size(), 709493966490);
    assert_eq!(chunk.data_size(), 578957026724);
    assert_eq!(chunk.dummy_size(), 0);
    assert_eq!(chunk.chunk_size(ids::AXML), Some(13130288));
}

#[test]
fn ds64_chunk_write_read() {
    let mut chunk = DataSize64Chunk::new(987654321, 123456789, BTreeMap::new());
    chunk.set_chunk_size(ids::AXML, 654321);

    let mut bytes = Vec::new();
    chunk.write(&mut bytes).unwrap();

    let mut stream = Cursor::new(bytes);
    let reread = parse_data_size64_chunk(&mut stream, ids::DS64, 40).unwrap();
    assert_eq!(reread.bw64_size(), 987654321);
    assert_eq!(reread.data_size(), 123456789);
    assert_eq!(reread.table_length(), 1);
    assert_eq!(reread.chunk_size(ids::AXML), Some(654321));
}

#[test]
fn ds64_chunk_junk_padding_skipped() {
    // table followed by 12 bytes of junk padding up to the declared size
    let mut bytes = Vec::new();
    DataSize64Chunk::new(1000, 900, BTreeMap::new())
        .write(&mut bytes)
        .unwrap();
    bytes.extend_from_slice(&[0u8; 12]);

    let mut stream = Cursor::new(bytes);
    let chunk = parse_data_size64_chunk(&mut stream, ids::DS64, 40).unwrap();
    assert_eq!(chunk.bw64_size(), 1000);
    assert_eq!(chunk.table_length(), 0);
    assert_eq!(stream.position(), 40);
}

#[test]
fn ds64_chunk_wrong_id() {
    let mut stream = Cursor::new(&b"\x9a\xc6\x22\x31\xa5\x00\x00\x00"[..]);
    assert!(parse_data_size64_chunk(&mut stream, FourCC::new(b"ds65"), 8).is_err());
}

#[test]
fn ds64_chunk_wrong_size() {
    let mut stream = Cursor::new(&b"\x9a\xc6\x22\x31\xa5\x00\x00\x00"[..]);
    assert!(parse_data_size64_chunk(&mut stream, ids::DS64, 8).is_err());
}

const CUE_TWO_POINTS: &[u8] = b"\x02\x00\x00\x00\
    \x01\x00\x00\x00\
    \x20\x4e\x00\x00\
    \x64\x61\x74\x61\
    \x00\x00\x00\x00\
    \x00\x00\x00\x00\
    \x20\x4e\x00\x00\
    \x02\x00\x00\x00\
    \x40\x9c\x00\x00\
    \x64\x61\x74\x61\
    \x00\x00\x00\x00\
    \x00\x00\x00\x00\
    \x40\x9c\x00\x00";

#[test]
fn cue_chunk_basic() {
    let mut stream = Cursor::new(CUE_TWO_POINTS);
    let chunk = parse_cue_chunk(&mut stream, ids::CUE, 52).unwrap();
    assert_eq!(chunk.cue_points().len(), 2);
    assert_eq!(chunk.cue_points()[0].id, 1);
    assert_eq!(chunk.cue_points()[0].position, 20000);
    assert_eq!(chunk.cue_points()[0].data_chunk_id, ids::DATA);
    assert_eq!(chunk.cue_points()[0].chunk_start, 0);
    assert_eq!(chunk.cue_points()[0].block_start, 0);
    assert_eq!(chunk.cue_points()[0].sample_offset, 20000);
    assert_eq!(chunk.cue_points()[1].id, 2);
    assert_eq!(chunk.cue_points()[1].position, 40000);
    assert_eq!(chunk.cue_points()[1].sample_offset, 40000);
}

#[test]
fn cue_chunk_write_read() {
    let chunk = CueChunk::new(vec![
        CuePoint::new(1, 20000, ""),
        CuePoint::new(2, 40000, ""),
    ]);
    let mut bytes = Vec::new();
    chunk.write(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 52);

    let mut stream = Cursor::new(bytes);
    let reread = parse_cue_chunk(&mut stream, ids::CUE, 52).unwrap();
    assert_eq!(reread.cue_points().len(), 2);
    assert_eq!(reread.cue_points()[0].id, 1);
    assert_eq!(reread.cue_points()[0].position, 20000);
    assert_eq!(reread.cue_points()[1].id, 2);
    assert_eq!(reread.cue_points()[1].position, 40000);
}

#[test]
fn cue_chunk_wrong_id() {
    let mut stream = Cursor::new(&b"\x00\x00\x00\x00"[..]);
    assert!(parse_cue_chunk(&mut stream, FourCC::new(b"cuee"), 4).is_err());
}

#[test]
fn cue_chunk_size_mismatch() {
    // count says one point but the size has room for none
    let mut stream = Cursor::new(&b"\x01\x00\x00\x00"[..]);
    assert!(parse_cue_chunk(&mut stream, ids::CUE, 4).is_err());

    // count says two points but the size has room for one
    let mut bytes = CUE_TWO_POINTS[..28].to_vec();
    bytes[0] = 0x02;
    let mut stream = Cursor::new(bytes);
    assert!(parse_cue_chunk(&mut stream, ids::CUE, 28).is_err());
}

#[test]
fn label_chunk_basic() {
    let bytes: &[u8] = b"\x01\x00\x00\x00\x4d\x61\x72\x6b\x65\x72\x20\x31\x00";
    let mut stream = Cursor::new(bytes);
    let chunk = parse_label_chunk(&mut stream, ids::LABL, 13).unwrap();
    assert_eq!(chunk.cue_point_id(), 1);
    assert_eq!(chunk.label(), "Marker 1");
}

#[test]
fn label_chunk_write_read() {
    let chunk = LabelChunk::new(2, "Test Label");
    let mut bytes = Vec::new();
    chunk.write(&mut bytes).unwrap();

    let mut stream = Cursor::new(bytes);
    let reread = parse_label_chunk(&mut stream, ids::LABL, 15).unwrap();
    assert_eq!(reread.cue_point_id(), 2);
    assert_eq!(reread.label(), "Test Label");
}

#[test]
fn label_chunk_wrong_id() {
    let bytes: &[u8] = b"\x01\x00\x00\x00\x54\x65\x73\x74\x00";
    let mut stream = Cursor::new(bytes);
    assert!(parse_label_chunk(&mut stream, FourCC::new(b"labe"), 9).is_err());
}

#[test]
fn label_chunk_too_small() {
    let mut stream = Cursor::new(&b"\x01\x00\x00\x00"[..]);
    assert!(parse_label_chunk(&mut stream, ids::LABL, 4).is_err());
}

#[test]
fn label_chunk_empty_label() {
    let mut stream = Cursor::new(&b"\x03\x00\x00\x00\x00"[..]);
    let chunk = parse_label_chunk(&mut stream, ids::LABL, 5).unwrap();
    assert_eq!(chunk.cue_point_id(), 3);
    assert_eq!(chunk.label(), "");
}

#[test]
fn label_chunk_padding_after_null() {
    let bytes: &[u8] = b"\x04\x00\x00\x00\x54\x65\x73\x74\x00\x00\x00";
    let mut stream = Cursor::new(bytes);
    let chunk = parse_label_chunk(&mut stream, ids::LABL, 11).unwrap();
    assert_eq!(chunk.cue_point_id(), 4);
    assert_eq!(chunk.label(), "Test");
}

#[test]
fn list_chunk_adtl_with_labels() {
    // adtl list: "Marker 1" label (13 bytes, padded) + empty label (5 bytes, padded)
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"adtl");
    bytes.extend_from_slice(b"labl");
    bytes.extend_from_slice(&13u32.to_le_bytes());
    bytes.extend_from_slice(b"\x01\x00\x00\x00Marker 1\x00");
    bytes.push(0); // pad
    bytes.extend_from_slice(b"labl");
    bytes.extend_from_slice(&5u32.to_le_bytes());
    bytes.extend_from_slice(b"\x02\x00\x00\x00\x00");
    bytes.push(0); // pad

    let size = bytes.len() as u64;
    let mut stream = Cursor::new(bytes);
    let list = parse_list_chunk(&mut stream, ids::LIST, size).unwrap();
    assert_eq!(list.list_type(), ids::ADTL);
    assert_eq!(list.sub_chunks().len(), 2);
}

#[test]
fn list_chunk_skips_unknown_sub_chunks() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"adtl");
    bytes.extend_from_slice(b"note");
    bytes.extend_from_slice(&6u32.to_le_bytes());
    bytes.extend_from_slice(b"\x01\x00\x00\x00hi");
    bytes.extend_from_slice(b"labl");
    bytes.extend_from_slice(&13u32.to_le_bytes());
    bytes.extend_from_slice(b"\x01\x00\x00\x00Marker 1\x00");
    bytes.push(0); // pad

    let size = bytes.len() as u64;
    let mut stream = Cursor::new(bytes);
    let list = parse_list_chunk(&mut stream, ids::LIST, size).unwrap();
    assert_eq!(list.sub_chunks().len(), 2);
    assert_eq!(list.sub_chunks()[0].id(), FourCC::new(b"note"));
    assert_eq!(list.sub_chunks()[1].id(), ids::LABL);
}

#[test]
fn list_chunk_truncated_sub_chunk() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"adtl");
    bytes.extend_from_slice(b"labl");
    bytes.extend_from_slice(&100u32.to_le_bytes()); // claims more than the list holds
    bytes.extend_from_slice(b"\x01\x00\x00\x00x\x00");

    let size = bytes.len() as u64;
    let mut stream = Cursor::new(bytes);
    assert!(parse_list_chunk(&mut stream, ids::LIST, size).is_err());
}
