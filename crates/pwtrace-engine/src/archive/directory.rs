use std::io::{Read, Seek, SeekFrom};

const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const ZIP64_LOCATOR_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x06, 0x07];
const ZIP64_EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x06, 0x06];
const EOCD_LEN: usize = 22;
const ZIP64_LOCATOR_LEN: usize = 20;
const ZIP64_EOCD_LEN: usize = 56;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;

/// Number of entries the end-of-central-directory record declares.
///
/// `ZipArchive` indexes entries by name, so a container holding two entries
/// with the same name reports fewer entries than this. Returns `None` when the
/// record cannot be located.
pub fn declared_entry_count<R: Read + Seek>(reader: &mut R) -> std::io::Result<Option<u64>> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    let tail_len = file_len.min((EOCD_LEN + MAX_COMMENT_LEN + ZIP64_LOCATOR_LEN) as u64);
    reader.seek(SeekFrom::Start(file_len - tail_len))?;
    let mut tail = vec![0u8; tail_len as usize];
    reader.read_exact(&mut tail)?;

    let Some(eocd) = find_eocd(&tail) else {
        return Ok(None);
    };
    let entries = le_u16(&tail[eocd + 10..]);
    if entries != u16::MAX {
        return Ok(Some(u64::from(entries)));
    }

    // zip64: the locator sits right before the classic record.
    let Some(locator_start) = eocd.checked_sub(ZIP64_LOCATOR_LEN) else {
        return Ok(None);
    };
    let locator = &tail[locator_start..eocd];
    if locator[..4] != ZIP64_LOCATOR_SIGNATURE {
        return Ok(None);
    }
    let record_offset = le_u64(&locator[8..]);
    if record_offset.saturating_add(ZIP64_EOCD_LEN as u64) > file_len {
        return Ok(None);
    }
    reader.seek(SeekFrom::Start(record_offset))?;
    let mut record = [0u8; ZIP64_EOCD_LEN];
    reader.read_exact(&mut record)?;
    if record[..4] != ZIP64_EOCD_SIGNATURE {
        return Ok(None);
    }
    Ok(Some(le_u64(&record[32..])))
}

fn find_eocd(tail: &[u8]) -> Option<usize> {
    if tail.len() < EOCD_LEN {
        return None;
    }
    (0..=tail.len() - EOCD_LEN).rev().find(|&start| {
        tail[start..start + 4] == EOCD_SIGNATURE
            && start + EOCD_LEN + usize::from(le_u16(&tail[start + 20..])) == tail.len()
    })
}

fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buffer = [0u8; 8];
    buffer.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buffer)
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
