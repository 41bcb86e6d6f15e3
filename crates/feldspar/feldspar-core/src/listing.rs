//! Directory listing rendering: one UNIX long-listing line per entry.

use basalt_vfs::FileInfo;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Renders one `ls -l` style line, CRLF terminated.
///
/// Attributes map from the FAT bits: the directory bit selects `d` and the
/// execute slots, read-only removes `w`, and the triplet repeats for owner,
/// group and other. User and group are hardcoded to `anonymous`; the date
/// comes from the packed FAT words.
pub fn unix_listing_line(info: &FileInfo) -> String {
    let kind = if info.is_dir { 'd' } else { '-' };
    let w = if info.read_only { '-' } else { 'w' };
    let x = if info.is_dir { 'x' } else { '-' };
    let month = MONTHS
        .get((info.month() as usize).wrapping_sub(1))
        .copied()
        .unwrap_or("???");
    format!(
        "{kind}r{w}{x}r{w}{x}r{w}{x} 1 anonymous  anonymous  {size:>10} {month} {day:02} {hour:02}:{minute:02} {name}\r\n",
        size = info.size,
        day = info.day(),
        hour = info.hour(),
        minute = info.minute(),
        name = info.name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(name: &str, size: u64, is_dir: bool, read_only: bool) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            size,
            is_dir,
            read_only,
            fdate: FileInfo::pack_date(2024, 3, 7),
            ftime: FileInfo::pack_time(14, 5, 0),
            ..FileInfo::default()
        }
    }

    #[test]
    fn plain_file_line() {
        let line = unix_listing_line(&stamped("hello.txt", 1234, false, false));
        assert_eq!(
            line,
            "-rw-rw-rw- 1 anonymous  anonymous        1234 Mar 07 14:05 hello.txt\r\n"
        );
    }

    #[test]
    fn directory_line() {
        let line = unix_listing_line(&stamped("logs", 0, true, false));
        assert_eq!(
            line,
            "drwxrwxrwx 1 anonymous  anonymous           0 Mar 07 14:05 logs\r\n"
        );
    }

    #[test]
    fn read_only_file_line() {
        let line = unix_listing_line(&stamped("rom.bin", 42, false, true));
        assert_eq!(
            line,
            "-r--r--r-- 1 anonymous  anonymous          42 Mar 07 14:05 rom.bin\r\n"
        );
    }

    #[test]
    fn month_out_of_range_renders_placeholder() {
        let mut info = stamped("odd", 1, false, false);
        info.fdate = 0;
        let line = unix_listing_line(&info);
        assert!(line.contains(" ??? "));
    }
}
