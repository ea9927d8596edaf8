//! Playback Context - 传输控制参数

/// 倍速范围（超出范围的值被钳制而非拒绝）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateRange {
    min: f64,
    max: f64,
}

impl RateRange {
    /// 创建范围；`min > max` 时交换两端
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn clamp(&self, rate: f64) -> f64 {
        rate.clamp(self.min, self.max)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl Default for RateRange {
    fn default() -> Self {
        Self { min: 0.5, max: 2.0 }
    }
}

/// 播放控制器参数
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    pub rate_range: RateRange,
    /// 初始音量 (0.0 - 1.0)
    pub default_volume: f64,
    /// 快进/快退步长（秒）
    pub skip_secs: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            rate_range: RateRange::default(),
            default_volume: 0.7,
            skip_secs: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_clamp() {
        let range = RateRange::default();
        assert_eq!(range.clamp(3.0), 2.0);
        assert_eq!(range.clamp(0.1), 0.5);
        assert_eq!(range.clamp(1.25), 1.25);
    }

    #[test]
    fn test_inverted_range_is_normalized() {
        let range = RateRange::new(2.0, 0.5);
        assert_eq!(range.min(), 0.5);
        assert_eq!(range.max(), 2.0);
    }
}
