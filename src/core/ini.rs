use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// 保留原始格式的 INI 編輯器
///
/// Emulator INI files are owned by the emulator, so edits keep every other
/// line (comments, ordering, unknown keys) untouched. Section and key names
/// compare case-insensitively; keys that appear before the first section
/// header belong to the section `""`.
#[derive(Debug, Clone)]
pub struct IniFile {
    path: PathBuf,
    lines: Vec<String>,
    line_ending: &'static str,
    dirty: bool,
}

enum LineKind<'a> {
    Section(&'a str),
    Entry { key: &'a str, value: &'a str },
    Other,
}

fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.starts_with(';') || trimmed.starts_with('#') || trimmed.is_empty() {
        return LineKind::Other;
    }
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return LineKind::Section(trimmed[1..trimmed.len() - 1].trim());
    }
    match trimmed.split_once('=') {
        Some((key, value)) => LineKind::Entry {
            key: key.trim(),
            value: value.trim(),
        },
        None => LineKind::Other,
    }
}

impl IniFile {
    /// 載入 INI 檔案；檔案不存在時視為空白文件
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::parse(path, &content))
    }

    fn parse(path: PathBuf, content: &str) -> Self {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let line_ending = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let lines = content.lines().map(str::to_string).collect();

        Self {
            path,
            lines,
            line_ending,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the line range `(header, end)` of a section. For the implicit
    /// global section the header is `None`.
    fn section_bounds(&self, section: &str) -> Option<(Option<usize>, usize)> {
        let mut start: Option<Option<usize>> = if section.is_empty() { Some(None) } else { None };

        for (index, line) in self.lines.iter().enumerate() {
            if let LineKind::Section(name) = classify(line) {
                if let Some(header) = start {
                    return Some((header, index));
                }
                if name.eq_ignore_ascii_case(section) {
                    start = Some(Some(index));
                }
            }
        }

        start.map(|header| (header, self.lines.len()))
    }

    fn find_entry(&self, section: &str, key: &str) -> Option<usize> {
        let (header, end) = self.section_bounds(section)?;
        let begin = header.map(|h| h + 1).unwrap_or(0);

        (begin..end).find(|&index| {
            matches!(classify(&self.lines[index]), LineKind::Entry { key: k, .. } if k.eq_ignore_ascii_case(key))
        })
    }

    /// `None` when the key does not exist, `Some("")` when it exists but is empty.
    pub fn get_value(&self, section: &str, key: &str) -> Option<&str> {
        let index = self.find_entry(section, key)?;
        match classify(&self.lines[index]) {
            LineKind::Entry { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn write_value(&mut self, section: &str, key: &str, value: &str) {
        if let Some(index) = self.find_entry(section, key) {
            // 保留原本的鍵名大小寫
            let replacement = match classify(&self.lines[index]) {
                LineKind::Entry { value: v, .. } if v == value => None,
                LineKind::Entry { key: k, .. } => Some(format!("{}={}", k, value)),
                _ => Some(format!("{}={}", key, value)),
            };
            if let Some(line) = replacement {
                self.lines[index] = line;
                self.dirty = true;
            }
            return;
        }

        let entry = format!("{}={}", key, value);
        match self.section_bounds(section) {
            Some((header, end)) => {
                // 插入在區段最後一個非空白行之後
                let begin = header.map(|h| h + 1).unwrap_or(0);
                let mut insert_at = end;
                while insert_at > begin && self.lines[insert_at - 1].trim().is_empty() {
                    insert_at -= 1;
                }
                self.lines.insert(insert_at, entry);
            }
            None => {
                if self.lines.last().is_some_and(|l| !l.trim().is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.push(format!("[{}]", section));
                self.lines.push(entry);
            }
        }
        self.dirty = true;
    }

    pub fn to_ini_string(&self) -> String {
        let mut out = self.lines.join(self.line_ending);
        if !out.is_empty() {
            out.push_str(self.line_ending);
        }
        out
    }

    /// 只有內容變更時才寫回磁碟
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, self.to_ini_string())?;
        self.dirty = false;
        tracing::debug!("Saved {}", self.path.display());
        Ok(())
    }
}
