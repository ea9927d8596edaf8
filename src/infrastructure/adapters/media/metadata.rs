//! 基于 symphonia 的音频元数据探测

use std::io::Cursor;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use crate::application::ports::MediaError;

/// 探测音频时长（秒）
///
/// 容器头中没有帧数时（如无 Xing 头的 mp3），累加所有包的时长
pub fn probe_duration(data: Vec<u8>, extension: Option<&str>) -> Result<f64, MediaError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| MediaError::Decode(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| MediaError::Decode("No audio track found".to_string()))?;

    let track_id = track.id;
    let params = &track.codec_params;
    let time_base = params
        .time_base
        .or_else(|| params.sample_rate.map(|rate| TimeBase::new(1, rate)))
        .ok_or_else(|| MediaError::Decode("Unknown time base".to_string()))?;

    if let Some(n_frames) = params.n_frames {
        return Ok(seconds(time_base, n_frames));
    }

    let mut total = 0u64;
    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => total += packet.dur,
            Ok(_) => {}
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(MediaError::Decode(format!("Packet read error: {}", e)));
            }
        }
    }

    Ok(seconds(time_base, total))
}

fn seconds(time_base: TimeBase, ts: u64) -> f64 {
    let time = time_base.calc_time(ts);
    time.seconds as f64 + time.frac
}
