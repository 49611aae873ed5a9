//! FLV Inspector - Lists the tags of an FLV file or stream
//!
//! Run with: cargo run --example flv_inspect -- <file.flv | ->
//!
//! Passing `-` reads the stream from stdin, so a live capture can be piped in:
//!
//! ```text
//! ffmpeg -i rtmp://localhost/live/key -c copy -f flv - | cargo run --example flv_inspect -- -
//! ```
//!
//! This example demonstrates:
//! - Opening a file with `FileSource` or a pipe with `LiveSource` + `pump`
//! - Running the blocking demuxer off the async runtime
//! - Stopping a long parse with a `CancellationToken` on Ctrl+C
//! - Per-tag timing and whole-stream statistics

use flv_demux::source::{live_source, pump, ByteSource, FileSource};
use flv_demux::stats::{DemuxStats, TimingTracker};
use flv_demux::{DemuxConfig, FlvDemuxer, FlvTag, TagBody};
use tokio_util::sync::CancellationToken;

fn describe(tag: &FlvTag) -> String {
    match &tag.body {
        TagBody::Video(v) => {
            let nals: Vec<String> = v.nal_units.iter().map(|n| n.nal_type.to_string()).collect();
            let packet = v
                .packet_type
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{} {} {} cts={} nals=[{}]{}",
                v.frame_type,
                v.codec,
                packet,
                v.composition_time,
                nals.join(", "),
                if v.truncated { " (truncated)" } else { "" }
            )
        }
        TagBody::Audio(a) => {
            let aac = a
                .aac_packet_type
                .map(|p| format!(" {}", p))
                .unwrap_or_default();
            format!(
                "{} {} {}bit {}ch{}",
                a.sound_format,
                a.sound_rate,
                a.sound_size.bits(),
                a.sound_type.channels(),
                aac
            )
        }
        TagBody::Script => "script data".to_string(),
        TagBody::Other => "unknown tag type".to_string(),
        TagBody::Empty => "empty".to_string(),
    }
}

fn inspect<S: ByteSource>(source: S, cancel: CancellationToken) -> flv_demux::Result<DemuxStats> {
    let mut demuxer = FlvDemuxer::open_with(source, DemuxConfig::default(), cancel)?;
    if let Some(header) = demuxer.header() {
        println!(
            "FLV v{} audio={} video={} hevc_annexb={}",
            header.version,
            header.has_audio(),
            header.has_video(),
            demuxer.hevc_is_annexb()
        );
    }
    println!();

    let mut stats = DemuxStats::new();
    let mut timing = TimingTracker::new();
    while let Some(tag) = demuxer.next_tag()? {
        let t = timing.observe(&tag);
        println!(
            "#{:<6} @{:<10} {:?} size={:<6} dts={:<8} pts={:<8} d={:<5} pd={:<5} {}",
            t.index,
            tag.address,
            tag.tag_type,
            tag.data_size,
            t.dts,
            t.pts,
            t.dts_delta,
            t.pts_delta,
            describe(&tag)
        );
        stats.record(&tag);
    }
    Ok(stats)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flv_demux=info".parse()?),
        )
        .init();

    let input = std::env::args()
        .nth(1)
        .ok_or("usage: flv_inspect <file.flv | ->")?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let stats = if input == "-" {
        let (feed, source) = live_source("stdin");
        let source = source.with_cancellation(cancel.clone());
        let reader = tokio::spawn(pump(tokio::io::stdin(), feed));
        let stats = tokio::task::spawn_blocking(move || inspect(source, cancel)).await??;
        reader.abort();
        stats
    } else {
        let source = FileSource::open(&input)?;
        tokio::task::spawn_blocking(move || inspect(source, cancel)).await??
    };

    println!();
    println!("Tags:            {}", stats.tags);
    println!("  video:         {}", stats.video_tags);
    println!("  audio:         {}", stats.audio_tags);
    println!("  script:        {}", stats.script_tags);
    println!("Keyframes:       {}", stats.keyframes);
    println!("NAL units:       {}", stats.nal_units);
    println!("Truncated tags:  {}", stats.truncated_tags);
    println!("Bad tag sizes:   {}", stats.previous_tag_size_mismatches);
    println!("Duration:        {} ms", stats.duration_ms());
    println!("Bitrate:         {} bps", stats.bitrate());

    Ok(())
}
