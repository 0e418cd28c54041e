//! # Lectura por Bloques
//! src/artifacts/stream.rs
//!
//! Iterador perezoso y finito de bloques de tamaño fijo sobre un archivo.
//! Cada `ChunkStream` abre el archivo de nuevo, así que se puede volver a
//! leer desde el principio creando otro.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Tamaño de bloque por defecto
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Bloques de un archivo en disco
pub struct ChunkStream {
    file: Option<File>,
    chunk_size: usize,
}

impl ChunkStream {
    pub fn open(path: &Path, chunk_size: usize) -> io::Result<Self> {
        Ok(Self {
            file: Some(File::open(path)?),
            chunk_size: chunk_size.max(1),
        })
    }
}

impl Iterator for ChunkStream {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let file = self.file.as_mut()?;
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;

        // Llenar el bloque completo salvo al final del archivo
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.file = None;
                    return Some(Err(e));
                }
            }
        }

        if filled == 0 {
            self.file = None;
            return None;
        }
        if filled < buf.len() {
            self.file = None;
        }
        buf.truncate(filled);
        Some(Ok(buf))
    }
}
