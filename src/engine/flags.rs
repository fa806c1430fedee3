//! ### English
//! Bitflags controlling the root-filesystem boot decision.
//!
//! These are passed through the C ABI as a `u32` bitmask and read once per boot attempt.
//!
//! ### 中文
//! 控制根文件系统启动决策的位标志（bitflags）。
//!
//! 通过 C ABI 以 `u32` 位掩码传入，每次启动尝试只读取一次。

/// ### English
/// The operator asked for the root filesystem to be reinstalled even if one already exists.
///
/// ### 中文
/// 操作者要求重新安装根文件系统（即使已存在）。
pub const TWOYI_BOOT_FLAG_FORCE_ROM_REINSTALL: u32 = 1 << 0;

/// ### English
/// A third-party root filesystem is configured instead of the bundled factory image.
///
/// When set, an updated factory image alone does not trigger re-extraction.
///
/// ### 中文
/// 使用第三方根文件系统而非内置出厂镜像。
///
/// 设置后，仅出厂镜像更新不会触发重新解压。
pub const TWOYI_BOOT_FLAG_USE_THIRD_PARTY_ROM: u32 = 1 << 1;

/// ### English
/// Decoded boot configuration.
///
/// ### 中文
/// 解码后的启动配置。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootConfig {
    pub force_reinstall: bool,
    pub use_third_party_rom: bool,
}

impl BootConfig {
    /// ### English
    /// Decodes a `TWOYI_BOOT_FLAG_*` bitmask. Unknown bits are ignored.
    ///
    /// ### 中文
    /// 解码 `TWOYI_BOOT_FLAG_*` 位掩码；未知位会被忽略。
    pub fn from_flags(flags: u32) -> Self {
        Self {
            force_reinstall: (flags & TWOYI_BOOT_FLAG_FORCE_ROM_REINSTALL) != 0,
            use_third_party_rom: (flags & TWOYI_BOOT_FLAG_USE_THIRD_PARTY_ROM) != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_flag_independently() {
        assert_eq!(BootConfig::from_flags(0), BootConfig::default());
        assert!(BootConfig::from_flags(TWOYI_BOOT_FLAG_FORCE_ROM_REINSTALL).force_reinstall);
        assert!(!BootConfig::from_flags(TWOYI_BOOT_FLAG_FORCE_ROM_REINSTALL).use_third_party_rom);
        let both = BootConfig::from_flags(
            TWOYI_BOOT_FLAG_FORCE_ROM_REINSTALL | TWOYI_BOOT_FLAG_USE_THIRD_PARTY_ROM | 1 << 7,
        );
        assert!(both.force_reinstall && both.use_third_party_rom);
    }
}
