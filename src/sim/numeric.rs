//! 数值工具
//!
//! 浮点时间比较与默认间隔的推导。

/// 默认相对容差
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// 两个时间点是否“足够接近”（默认容差）
pub fn is_close(a: f64, b: f64) -> bool {
    is_close_eps(a, b, DEFAULT_EPSILON)
}

/// b 为 0 时比较绝对差，否则比较相对差
pub fn is_close_eps(a: f64, b: f64, eps: f64) -> bool {
    if a == b {
        return true;
    }
    if b == 0.0 {
        return (a - b).abs() < eps;
    }
    (a - b).abs() / b.abs() < eps
}

/// 输出间隔的默认值：先取 `10^(round(log10(d)) - 3)`，再按采样数所在区间调整
pub fn auto_interval(duration: f64) -> f64 {
    let mut h = 10f64.powf(duration.log10().round() - 3.0);
    let n = duration / h;

    if n >= 2500.0 {
        h *= 5.0;
    } else if n >= 2000.0 {
        h *= 4.0;
    } else if n >= 1000.0 {
        h *= 2.0;
    } else if n <= 200.0 {
        h /= 5.0;
    } else if n <= 250.0 {
        h /= 4.0;
    } else if n <= 500.0 {
        h /= 2.0;
    }

    h
}

/// 固定步长求解器的默认步长
pub fn default_step_size(duration: f64) -> f64 {
    10f64.powf(duration.log10().round() - 3.0)
}
