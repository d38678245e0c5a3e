//! End-to-end mux → demux round trips.

use riffavi::{
    probe, AudioParameters, AviDemuxer, AviError, AviMuxer, Packet, VideoParameters,
};
use std::io::Cursor;
use std::time::Duration;

fn h264_640x480() -> riffavi::CodecParameters {
    VideoParameters::h264(640, 480, 25.0, vec![0x01, 0x64, 0x00, 0x1F, 0xFF]).into()
}

fn mux_frames(frames: &[(Vec<u8>, bool)]) -> Vec<u8> {
    let mut muxer = AviMuxer::new(Cursor::new(Vec::new()));
    muxer.write_header(&[h264_640x480()]).unwrap();
    for (data, keyframe) in frames {
        muxer
            .write_packet(&Packet::new(0, *keyframe, data.clone()))
            .unwrap();
    }
    muxer.write_trailer().unwrap();
    muxer.into_inner().into_inner()
}

fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("marker present")
}

#[test]
fn empty_video_file() {
    let output = mux_frames(&[]);

    assert_eq!(&output[0..4], [0x52, 0x49, 0x46, 0x46]); // RIFF
    assert_eq!(&output[8..12], [0x41, 0x56, 0x49, 0x20]); // AVI
    assert!(probe(&output));

    let mut demuxer = AviDemuxer::new(Cursor::new(output));
    let streams = demuxer.streams().unwrap();
    assert_eq!(streams.len(), 1);
    assert!(streams[0].is_video());
    assert!(demuxer.read_packet().unwrap().is_none());
}

#[test]
fn single_odd_sized_packet() {
    let output = mux_frames(&[(vec![0x01, 0x02, 0x03], true)]);
    assert_eq!(output.len() % 2, 0);

    // idx1 holds exactly one entry: 00dc, keyframe, offset 0, size 3.
    let idx1 = find(&output, b"idx1");
    let entry = &output[idx1 + 8..idx1 + 24];
    assert_eq!(&entry[0..4], b"00dc");
    assert_eq!(u32::from_le_bytes(entry[4..8].try_into().unwrap()), 0x10);
    assert_eq!(u32::from_le_bytes(entry[8..12].try_into().unwrap()), 0);
    assert_eq!(u32::from_le_bytes(entry[12..16].try_into().unwrap()), 3);

    let mut demuxer = AviDemuxer::new(Cursor::new(output));
    let packet = demuxer.read_packet().unwrap().unwrap();
    assert!(packet.is_keyframe);
    assert_eq!(packet.data, vec![0x01, 0x02, 0x03]);
    assert!(demuxer.read_packet().unwrap().is_none());
}

#[test]
fn five_frame_sequence() {
    let frames: Vec<(Vec<u8>, bool)> = [(12, true), (8, false), (12, true), (10, false), (10, false)]
        .iter()
        .enumerate()
        .map(|(i, &(len, key))| (vec![i as u8; len], key))
        .collect();

    let output = mux_frames(&frames);
    let mut demuxer = AviDemuxer::new(Cursor::new(output));

    for (i, (data, keyframe)) in frames.iter().enumerate() {
        let packet = demuxer.read_packet().unwrap().unwrap_or_else(|| {
            panic!("missing packet {}", i);
        });
        assert_eq!(packet.stream_index, 0);
        assert_eq!(packet.is_keyframe, *keyframe, "keyframe flag of packet {}", i);
        assert_eq!(&packet.data, data, "payload of packet {}", i);
    }
    assert!(demuxer.read_packet().unwrap().is_none());
}

#[test]
fn mixed_audio_video_timing() {
    let mut muxer = AviMuxer::new(Cursor::new(Vec::new()));
    muxer
        .write_header(&[h264_640x480(), AudioParameters::aac(48_000, 2).into()])
        .unwrap();

    // Interleave 10 video and 20 audio packets, two audio per frame.
    for i in 0..10u8 {
        muxer
            .write_packet(&Packet::new(0, i == 0, vec![i; 100]))
            .unwrap();
        muxer.write_packet(&Packet::new(1, true, vec![i; 20])).unwrap();
        muxer.write_packet(&Packet::new(1, true, vec![i; 20])).unwrap();
    }
    muxer.write_trailer().unwrap();
    let output = muxer.into_inner().into_inner();

    let mut demuxer = AviDemuxer::new(Cursor::new(output));
    let streams = demuxer.streams().unwrap();
    assert_eq!(streams.len(), 2);
    let audio = streams[1].params.as_audio().unwrap();
    assert_eq!(audio.sample_rate, 48_000);
    assert_eq!(audio.channels, 2);

    let mut video_seen = 0u32;
    let mut audio_seen = 0u32;
    let mut total = 0u32;
    while let Some(packet) = demuxer.read_packet().unwrap() {
        total += 1;
        match packet.stream_index {
            0 => {
                // Video frame k plays at k * 40 ms.
                let expected = Duration::from_millis(40) * video_seen;
                let delta = packet.time.as_secs_f64() - expected.as_secs_f64();
                assert!(delta.abs() < 1e-9, "video packet {} time", video_seen);
                video_seen += 1;
            }
            1 => {
                // Audio packet k plays at k / 48000 s.
                let expected = audio_seen as f64 / 48_000.0;
                let delta = packet.time.as_secs_f64() - expected;
                assert!(delta.abs() < 1e-9, "audio packet {} time", audio_seen);
                audio_seen += 1;
            }
            other => panic!("unexpected stream index {}", other),
        }
    }

    assert_eq!(total, 30);
    assert_eq!(video_seen, 10);
    assert_eq!(audio_seen, 20);
}

#[test]
fn corrupt_outer_signature() {
    let mut output = mux_frames(&[(vec![0u8; 4], true)]);
    output[3] = b'X'; // RIFX

    let mut demuxer = AviDemuxer::new(Cursor::new(output));
    assert!(matches!(demuxer.streams(), Err(AviError::NotAvi)));
}

#[test]
fn truncated_index() {
    let frames: Vec<(Vec<u8>, bool)> = [(12, true), (8, false), (12, true), (10, false), (10, false)]
        .iter()
        .map(|&(len, key)| (vec![0xCC; len], key))
        .collect();
    let mut output = mux_frames(&frames);
    let len = output.len();
    output.truncate(len - 8);

    let mut demuxer = AviDemuxer::new(Cursor::new(output));
    assert!(matches!(demuxer.streams(), Err(AviError::UnexpectedEof)));
}

#[test]
fn offset_law() {
    let frames: Vec<(Vec<u8>, bool)> = (0..7u8).map(|i| (vec![i; 9 + i as usize], i % 3 == 0)).collect();
    let output = mux_frames(&frames);

    // The index origin is the first byte after the movi FourCC.
    let movi_data = find(&output, b"movi") + 4;
    let idx1 = find(&output, b"idx1");
    let entry_count = u32::from_le_bytes(output[idx1 + 4..idx1 + 8].try_into().unwrap()) / 16;
    assert_eq!(entry_count as usize, frames.len());

    for i in 0..entry_count as usize {
        let entry = &output[idx1 + 8 + i * 16..idx1 + 24 + i * 16];
        let offset = u32::from_le_bytes(entry[8..12].try_into().unwrap()) as usize;
        let size = u32::from_le_bytes(entry[12..16].try_into().unwrap()) as usize;

        let chunk = &output[movi_data + offset..];
        assert_eq!(&chunk[0..4], &entry[0..4], "entry {} chunk id", i);
        let chunk_size = u32::from_le_bytes(chunk[4..8].try_into().unwrap()) as usize;
        assert_eq!(chunk_size, size, "entry {} size", i);
        assert_eq!(size, frames[i].0.len(), "entry {} payload length", i);
    }
}

#[test]
fn g711_roundtrip() {
    let mut muxer = AviMuxer::new(Cursor::new(Vec::new()));
    muxer
        .write_header(&[AudioParameters::pcm_mulaw().into()])
        .unwrap();
    for i in 0..4u8 {
        muxer
            .write_packet(&Packet::new(0, true, vec![i; 160]))
            .unwrap();
    }
    muxer.write_trailer().unwrap();

    let mut demuxer = AviDemuxer::new(Cursor::new(muxer.into_inner().into_inner()));
    let streams = demuxer.streams().unwrap();
    assert_eq!(streams.len(), 1);
    let audio = streams[0].params.as_audio().unwrap();
    assert_eq!(audio.sample_rate, 8000);
    assert_eq!(audio.channels, 1);

    let mut count = 0;
    while let Some(packet) = demuxer.read_packet().unwrap() {
        assert_eq!(packet.data.len(), 160);
        count += 1;
    }
    assert_eq!(count, 4);
}

#[test]
fn seek_to_keyframe() {
    let frames: Vec<(Vec<u8>, bool)> = (0..8u8)
        .map(|i| (vec![i; 10], i % 4 == 0)) // keyframes at 0 and 4
        .collect();
    let output = mux_frames(&frames);

    let mut demuxer = AviDemuxer::new(Cursor::new(output));
    demuxer.streams().unwrap();
    demuxer.seek_to_frame(0, 6).unwrap();

    let packet = demuxer.read_packet().unwrap().unwrap();
    assert!(packet.is_keyframe);
    assert_eq!(packet.data, vec![4u8; 10]);
    // The clock resumes at the keyframe's own position.
    let expected = 4.0 * 0.04;
    assert!((packet.time.as_secs_f64() - expected).abs() < 1e-9);
}

#[test]
fn extradata_survives_roundtrip() {
    let avcc = vec![0x01, 0x64, 0x00, 0x29, 0xFF, 0xE1, 0x00, 0x05, 0x67, 0x64, 0x00, 0x29, 0xAC];
    let video = VideoParameters::h264(1920, 1080, 30.0, avcc.clone());

    let mut muxer = AviMuxer::new(Cursor::new(Vec::new()));
    muxer.write_header(&[video.into()]).unwrap();
    muxer.write_trailer().unwrap();

    let mut demuxer = AviDemuxer::new(Cursor::new(muxer.into_inner().into_inner()));
    let streams = demuxer.streams().unwrap();
    let parsed = streams[0].params.as_video().unwrap();
    assert_eq!(parsed.width, 1920);
    assert_eq!(parsed.height, 1080);
    assert_eq!(parsed.frame_rate, Some(30.0));
    assert_eq!(parsed.extradata, avcc);
}
